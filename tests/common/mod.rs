#![allow(dead_code, unused_imports)]

use std::sync::Arc;
use std::time::Duration;

use localplugin::exec::PluginExecutor;
use localplugin::plugin::{Plugin, PluginState};

pub use localplugin_test_utils::{bins, fake_executor, init_tracing, sh_executor, sink, with_timeout};

/// Poll until the plugin reaches `state`.
pub async fn wait_for_state<E: PluginExecutor>(plugin: &Plugin<E>, state: PluginState) {
    while plugin.state() != state {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Spawn `serve` on its own task.
pub fn spawn_serve<E>(
    plugin: &Arc<Plugin<E>>,
) -> tokio::task::JoinHandle<localplugin::errors::Result<()>>
where
    E: PluginExecutor + 'static,
{
    let plugin = Arc::clone(plugin);
    tokio::spawn(async move { plugin.serve().await })
}
