mod execute;
mod prepare;
mod prepare_ok;
mod row;
mod stmt_close;
mod stmt_reset;

pub(crate) use execute::Execute;
pub(crate) use prepare::Prepare;
pub(crate) use prepare_ok::PrepareOk;
pub(crate) use row::BinaryRow;
pub(crate) use stmt_close::StmtClose;
pub(crate) use stmt_reset::StmtReset;
