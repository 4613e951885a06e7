//! Delegation of file transfer to the external sync tool.

pub mod command;
pub mod transfer;

pub use command::{FilesystemSemantics, SyncCommand, SyncCommandBuilder, SyncOptions};
pub use transfer::{ProcessTransferer, TransferOutcome, Transferer};
