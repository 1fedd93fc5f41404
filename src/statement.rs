use std::sync::Arc;

use crate::protocol::column::MySqlColumn;
use crate::type_info::MySqlTypeInfo;

/// A statement prepared on one connection.
///
/// Statement ids are scoped to the connection that prepared them; the id
/// of the owning connection is recorded so that use on another connection
/// can be rejected instead of silently executing the wrong statement.
#[derive(Debug, Clone)]
pub struct MySqlStatement {
    pub(crate) id: u32,
    pub(crate) owner: u64,
    pub(crate) parameters: Vec<MySqlTypeInfo>,
    pub(crate) columns: Arc<[MySqlColumn]>,
}

impl MySqlStatement {
    /// The statement id assigned by the server.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The declared types of the statement's parameters.
    pub fn parameters(&self) -> &[MySqlTypeInfo] {
        &self.parameters
    }

    /// The columns of the statement's result set, if it produces one.
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }
}
