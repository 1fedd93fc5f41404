mod support;

use mysql_wire::{Error, MySqlArguments, MySqlConnectOptions, MySqlConnection};
use support::*;
use tokio::io::duplex;

fn options() -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .username("root")
        .password("secret")
        .database("shop")
}

#[tokio::test]
async fn select_version_round_trip() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd[0], 0x03);
        assert_eq!(&cmd[1..], b"SELECT @@version");

        server.send_column_count(1).await;
        server
            .send_column("@@version", TYPE_VAR_STRING, 0, UTF8_GENERAL_CI)
            .await;
        server.send_text_row(&[Some("8.0.32")]).await;
        server.send_ok_eof().await;
    });

    let mut conn = MySqlConnection::establish_with(client, &options()).await?;
    assert_eq!(conn.server_version(), "8.0.32");
    assert_eq!(conn.connection_id(), 42);

    let mut results = conn.query("SELECT @@version").await?;

    assert_eq!(results.columns().len(), 1);
    assert_eq!(results.columns()[0].name(), "@@version");

    let row = results.next().await?.expect("expected one row");
    assert_eq!(row.get("@@version").unwrap().as_str()?, "8.0.32");

    assert!(results.next().await?.is_none());

    let result = results.finish().await?;
    assert_eq!(result.affected_rows, 0);
    assert_eq!(result.last_insert_id, 0);

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn insert_returns_metadata_and_no_rows() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd[0], 0x03);

        server.send_ok(2, 42).await;
    });

    let mut conn = MySqlConnection::establish_with(client, &options()).await?;

    let mut results = conn.query("INSERT INTO t(x) VALUES(1),(2)").await?;

    assert!(results.next().await?.is_none());

    let result = results.finish().await?;
    assert_eq!(result.affected_rows, 2);
    assert_eq!(result.last_insert_id, 42);

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn prepared_select_with_parameter() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake().await;

        // COM_STMT_PREPARE
        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd[0], 0x16);
        assert_eq!(&cmd[1..], b"SELECT * FROM users WHERE id = ?");

        server.send_prepare_ok(1, 1, 2).await;
        server.send_column("?", TYPE_LONG, 0, UTF8_GENERAL_CI).await;
        server.send_column("id", TYPE_LONG, 0, UTF8_GENERAL_CI).await;
        server
            .send_column("name", TYPE_VAR_STRING, 0, UTF8_GENERAL_CI)
            .await;

        // COM_STMT_EXECUTE for statement 1
        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd[0], 0x17);
        assert_eq!(u32::from_le_bytes([cmd[1], cmd[2], cmd[3], cmd[4]]), 1);

        server.send_column_count(2).await;
        server.send_column("id", TYPE_LONG, 0, UTF8_GENERAL_CI).await;
        server
            .send_column("name", TYPE_VAR_STRING, 0, UTF8_GENERAL_CI)
            .await;

        // binary row: (7, "Joannis")
        let mut row = vec![0x00, 0x00];
        row.extend_from_slice(&7_i32.to_le_bytes());
        row.push(7);
        row.extend_from_slice(b"Joannis");
        server.send(&row).await;

        server.send_ok_eof().await;
    });

    let mut conn = MySqlConnection::establish_with(client, &options()).await?;

    let statement = conn.prepare("SELECT * FROM users WHERE id = ?").await?;
    assert_eq!(statement.parameters().len(), 1);
    assert_eq!(statement.columns().len(), 2);

    let arguments: MySqlArguments = [7_i64].into_iter().collect();
    let mut results = conn.execute(&statement, &arguments).await?;

    let row = results.next().await?.expect("expected one row");
    assert_eq!(row.get("id").unwrap().as_i64()?, 7);
    assert_eq!(row.get("name").unwrap().as_str()?, "Joannis");

    assert!(results.next().await?.is_none());
    let result = results.finish().await?;
    assert_eq!(result.affected_rows, 0);

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn bind_type_mismatch_fails_before_sending() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd[0], 0x16);

        server.send_prepare_ok(1, 1, 0).await;
        server
            .send_column("?", TYPE_LONG, FLAG_UNSIGNED, UTF8_GENERAL_CI)
            .await;

        // the failed execute must not reach the wire: the very next
        // command the server sees is the ping
        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd[0], 0x0e);

        server.send_ok(0, 0).await;
    });

    let mut conn = MySqlConnection::establish_with(client, &options()).await?;

    let statement = conn.prepare("INSERT INTO t(n) VALUES(?)").await?;

    let arguments: MySqlArguments = ["abc"].into_iter().collect();
    match conn.execute(&statement, &arguments).await {
        Err(Error::InvalidTypeBound { given, expected }) => {
            assert_eq!(given, "string");
            assert_eq!(expected, "INT UNSIGNED");
        }

        other => panic!("expected InvalidTypeBound, got {other:?}"),
    }

    conn.ping().await?;

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn server_error_leaves_connection_usable() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(&cmd[1..], b"SELECT * FROM nope");

        server
            .send_err(1146, "42S02", "Table 'nope' doesn't exist")
            .await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(&cmd[1..], b"SELECT 1");

        server.send_select_one().await;
    });

    let mut conn = MySqlConnection::establish_with(client, &options()).await?;

    match conn.query("SELECT * FROM nope").await {
        Err(Error::Server(err)) => {
            assert_eq!(err.code(), 1146);
            assert_eq!(err.sql_state(), Some("42S02"));
            assert_eq!(err.message(), "Table 'nope' doesn't exist");
        }

        other => panic!("expected a server error, got {other:?}"),
    }

    // the server re-synchronized; the connection is still good
    let mut results = conn.query("SELECT 1").await?;
    let row = results.next().await?.expect("expected one row");
    assert_eq!(row.get_index(0).unwrap().as_i64()?, 1);
    results.finish().await?;

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn dropped_result_set_is_drained_before_the_next_command() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd[0], 0x03);

        server.send_column_count(1).await;
        server.send_column("n", TYPE_LONG, 0, UTF8_GENERAL_CI).await;
        server.send_text_row(&[Some("1")]).await;
        server.send_text_row(&[Some("2")]).await;
        server.send_text_row(&[Some("3")]).await;
        server.send_ok_eof().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd[0], 0x0e);

        server.send_ok(0, 0).await;
    });

    let mut conn = MySqlConnection::establish_with(client, &options()).await?;

    let mut results = conn.query("SELECT n FROM seq").await?;
    let _first = results.next().await?.expect("expected a row");

    // abandon the remaining rows
    drop(results);

    // the unread rows are drained before the ping goes out
    conn.ping().await?;

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn second_query_after_an_abandoned_result_set_succeeds() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(&cmd[1..], b"SELECT n FROM seq");

        server.send_column_count(1).await;
        server.send_column("n", TYPE_LONG, 0, UTF8_GENERAL_CI).await;
        server.send_text_row(&[Some("1")]).await;
        server.send_text_row(&[Some("2")]).await;
        server.send_ok_eof().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(&cmd[1..], b"SELECT 1");

        server.send_select_one().await;
    });

    let mut conn = MySqlConnection::establish_with(client, &options()).await?;

    // abandon a result set without reading a single row; the command is
    // still mid-reply on the wire
    let results = conn.query("SELECT n FROM seq").await?;
    drop(results);

    // issuing the next command drains the abandoned reply rather than
    // failing; overlap of *live* commands cannot be written at all, as
    // a result set keeps the connection mutably borrowed
    let mut results = conn.query("SELECT 1").await?;
    let row = results.next().await?.expect("expected one row");
    assert_eq!(row.get_index(0).unwrap().as_i64()?, 1);
    results.finish().await?;

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn access_denied_is_invalid_credentials() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake_deny().await;
    });

    match MySqlConnection::establish_with(client, &options()).await {
        Err(Error::InvalidCredentials { username }) => assert_eq!(username, "root"),
        other => panic!("expected InvalidCredentials, got {other:?}"),
    }

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn caching_sha2_full_auth_is_refused() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake_full_auth().await;
    });

    match MySqlConnection::establish_with(client, &options()).await {
        Err(Error::Unsupported { what }) => {
            assert!(what.contains("caching_sha2_password"));
        }

        other => panic!("expected Unsupported, got {other:?}"),
    }

    server_task.await?;

    Ok(())
}

#[tokio::test]
async fn close_sends_quit() -> anyhow::Result<()> {
    let (client, server) = duplex(1 << 20);

    let server_task = tokio::spawn(async move {
        let mut server = MockServer::new(server);
        server.handshake().await;

        let cmd = server.expect_command().await.unwrap();
        assert_eq!(cmd, vec![0x01]);

        // the client hangs up after COM_QUIT
        assert!(server.expect_command().await.is_none());
    });

    let conn = MySqlConnection::establish_with(client, &options()).await?;
    conn.close().await?;

    server_task.await?;

    Ok(())
}
