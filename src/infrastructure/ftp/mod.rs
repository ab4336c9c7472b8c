//! FTP adapters.

mod session;

pub use session::{FtpSettings, FtpTransferSession};
