// SPDX-FileCopyrightText: 2026 asqlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordering and mutual-exclusion guarantees under concurrent callers.

use std::time::Duration;

use asqlite::Connection;
use proptest::prelude::*;

async fn log_table() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_script("CREATE TABLE log(who TEXT, seq INTEGER)")
        .await
        .unwrap();
    conn
}

async fn logged(conn: &Connection) -> Vec<(String, i64)> {
    let mut cursor = conn
        .execute("SELECT who, seq FROM log ORDER BY rowid", ())
        .await
        .unwrap();
    cursor
        .fetch_all()
        .await
        .unwrap()
        .iter()
        .map(|row| (row.get("who").unwrap(), row.get("seq").unwrap()))
        .collect()
}

// ---- Ordering ----

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Statements and raw-handle tasks, queued without awaiting in between,
    /// reach the database in exactly the order they were queued.
    #[test]
    fn queued_operations_run_in_submission_order(kinds in prop::collection::vec(any::<bool>(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (order, counts) = runtime.block_on(async {
            let conn = log_table().await;
            let mut statements = Vec::new();
            let mut probes = Vec::new();
            for (seq, via_statement) in kinds.iter().enumerate() {
                let seq = seq as i64;
                if *via_statement {
                    statements.push(conn.execute("INSERT INTO log VALUES ('s', ?1)", [seq]));
                } else {
                    probes.push(conn.call(move |conn| {
                        let before: i64 =
                            conn.query_row("SELECT count(*) FROM log", [], |row| row.get(0))?;
                        conn.execute("INSERT INTO log VALUES ('c', ?1)", [seq])?;
                        Ok((seq, before))
                    }));
                }
            }
            // Await in reverse; the queue order is already fixed.
            let mut counts = Vec::new();
            for probe in probes.into_iter().rev() {
                counts.push(probe.await.unwrap());
            }
            for statement in statements.into_iter().rev() {
                statement.await.unwrap();
            }
            let order: Vec<i64> = logged(&conn).await.into_iter().map(|(_, seq)| seq).collect();
            (order, counts)
        });

        prop_assert_eq!(order, (0..kinds.len() as i64).collect::<Vec<_>>());
        // Each probe saw exactly the operations queued before it.
        for (seq, before) in counts {
            prop_assert_eq!(seq, before);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_caller_keeps_its_own_order() {
    let conn = log_table().await;
    let callers: Vec<_> = (0..8)
        .map(|caller| {
            let conn = conn.clone();
            tokio::spawn(async move {
                let who = format!("caller-{caller}");
                for seq in 0..25i64 {
                    conn.execute(
                        "INSERT INTO log VALUES (?1, ?2)",
                        asqlite::Params::Positional(vec![who.clone().into(), seq.into()]),
                    )
                    .await
                    .unwrap();
                }
            })
        })
        .collect();
    for caller in callers {
        caller.await.unwrap();
    }

    let rows = logged(&conn).await;
    assert_eq!(rows.len(), 8 * 25);
    for caller in 0..8 {
        let who = format!("caller-{caller}");
        let seqs: Vec<i64> = rows
            .iter()
            .filter(|(w, _)| *w == who)
            .map(|(_, seq)| *seq)
            .collect();
        assert_eq!(seqs, (0..25).collect::<Vec<_>>());
    }
}

// ---- Mutual exclusion ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scope_holder_finishes_before_the_next_holder_starts() {
    let conn = log_table().await;

    let scope_a = conn.scope().await;
    let b = {
        let conn = conn.clone();
        tokio::spawn(async move {
            let _scope = conn.scope().await;
            for seq in 0..3 {
                conn.execute("INSERT INTO log VALUES ('b', ?1)", [seq])
                    .await
                    .unwrap();
            }
        })
    };

    // Give B time to block on the scope.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!b.is_finished());
    assert!(conn.try_scope().is_none());

    for seq in 0..3 {
        conn.execute("INSERT INTO log VALUES ('a', ?1)", [seq])
            .await
            .unwrap();
    }
    scope_a.release();
    b.await.unwrap();

    let who: Vec<String> = logged(&conn).await.into_iter().map(|(w, _)| w).collect();
    assert_eq!(who, vec!["a", "a", "a", "b", "b", "b"]);
    assert!(conn.try_scope().is_some());
}

async fn increment(conn: &Connection) -> asqlite::Result<()> {
    let _scope = conn.scope().await;
    conn.begin().await?;
    let mut cursor = conn.execute("SELECT n FROM counter", ()).await?;
    let rows = cursor.fetch_all().await?;
    let n: i64 = rows[0].get(0)?;
    tokio::task::yield_now().await;
    conn.execute("UPDATE counter SET n = ?1", [n + 1]).await?;
    conn.commit().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_callers_in_scopes_lose_no_updates() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_script("CREATE TABLE counter(n INTEGER); INSERT INTO counter VALUES (0);")
        .await
        .unwrap();

    let workers: Vec<_> = (0..2)
        .map(|_| {
            let conn = conn.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    increment(&conn).await.unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap();
    }

    let mut cursor = conn.execute("SELECT n FROM counter", ()).await.unwrap();
    let n: i64 = cursor.fetch_one().await.unwrap().unwrap().get(0).unwrap();
    assert_eq!(n, 40);
    assert!(!conn.in_transaction().await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_sequence_releases_the_scope() {
    let conn = log_table().await;

    let failed: asqlite::Result<()> = async {
        let _scope = conn.scope().await;
        conn.begin().await?;
        conn.execute("INSERT INTO log VALUES ('x', 1)", ()).await?;
        conn.execute("INSERT INTO missing VALUES (1)", ()).await?;
        conn.commit().await
    }
    .await;
    assert!(failed.is_err());

    // The scope is free again; the caller cleans up its transaction.
    let _scope = conn.try_scope().expect("scope released on the error path");
    conn.rollback().await.unwrap();
    assert!(logged(&conn).await.is_empty());
}
