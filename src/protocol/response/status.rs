// https://dev.mysql.com/doc/internals/en/status-flags.html#packet-Protocol::StatusFlags
// https://mariadb.com/kb/en/library/mariadb-connectorc-types-and-definitions/#server-status
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Status: u16 {
        // a multi-statement transaction has been started
        const IN_TRANS = 0x0001;

        // autocommit mode is set
        const AUTOCOMMIT = 0x0002;

        // multi query - next query exists
        const MORE_RESULTS_EXISTS = 0x0008;

        const NO_GOOD_INDEX_USED = 0x0010;
        const NO_INDEX_USED = 0x0020;

        // when using COM_STMT_FETCH, the current cursor still has a result
        const CURSOR_EXISTS = 0x0040;

        // when using COM_STMT_FETCH, the current cursor has finished
        const LAST_ROW_SENT = 0x0080;

        // database has been dropped
        const DB_DROPPED = 0x0100;

        // current escape mode is "no backslash escape"
        const NO_BACKSLASH_ESCAPES = 0x0200;

        // a DDL change forced an automatic re-prepare
        const METADATA_CHANGED = 0x0400;

        // the last statement was slower than long_query_time
        const QUERY_WAS_SLOW = 0x0800;

        // this result set contains stored procedure output parameters
        const PS_OUT_PARAMS = 0x1000;

        // current transaction is read-only
        const IN_TRANS_READONLY = 0x2000;

        // server state changed while executing the last statement
        const SESSION_STATE_CHANGED = 0x4000;
    }
}
