// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;
use serde_json::json;

use super::*;
use crate::broker::memory::InMemoryBroker;

fn test_config() -> Config {
    Config::parse_from(["qnetd"])
}

#[tokio::test]
async fn run_registers_agent_register_plugin_on_the_rpc_topic() -> anyhow::Result<()> {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
    let broker: Arc<dyn MessageBroker> = Arc::new(InMemoryBroker::new());
    let context = Context::new(Arc::clone(&store), Arc::clone(&broker));
    let shutdown = context.shutdown_handle();
    let config = test_config();

    let run_handle = {
        let config = config.clone();
        tokio::spawn(async move { context.run(&config).await })
    };

    let node = json!({
        "id": "uuid-a",
        "logical_id": "a",
        "node_type": "QNode",
        "settings": {},
        "channels": [],
    });
    let mut response = None;
    for _ in 0..50 {
        match broker.call(&config.rpc_server_topic, "register", node.clone(), Duration::from_secs(1)).await {
            Ok(value) => {
                response = Some(value);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(2)).await,
        }
    }
    let response = response.ok_or_else(|| anyhow::anyhow!("rpc handler never registered"))?;
    assert_eq!(response["status"]["code"], "OK");

    shutdown.cancel();
    run_handle.await.map_err(|e| anyhow::anyhow!("{e}"))??;
    Ok(())
}
