use std::time::{Duration, Instant};

use anyhow::Context;
use marquee_domain::ChartSandbox;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, Scope};
use serde_json::Value;
use tracing::debug;

/// Limits applied to every chart script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    pub max_operations: u64,
    pub timeout: Duration,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self { max_operations: 1_000_000, timeout: Duration::from_secs(5) }
    }
}

/// Runs generated chart scripts in an embedded Rhai engine.
///
/// Scripts see a single variable, `data`, and cannot import modules or touch
/// the file system or network. The figure is whatever the script leaves in
/// `fig`.
#[derive(Debug, Clone, Default)]
pub struct RhaiSandbox {
    limits: SandboxLimits,
}

impl RhaiSandbox {
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    fn engine(&self) -> Engine {
        let mut engine = Engine::new();
        engine
            .set_module_resolver(DummyModuleResolver::new())
            .set_max_operations(self.limits.max_operations)
            .set_max_call_levels(32)
            .set_max_expr_depths(64, 32)
            .set_max_string_size(1 << 20)
            .set_max_array_size(100_000)
            .set_max_map_size(10_000);
        engine.disable_symbol("eval");

        let started = Instant::now();
        let timeout = self.limits.timeout;
        engine.on_progress(move |_| {
            if started.elapsed() > timeout {
                Some(Dynamic::from("timeout"))
            } else {
                None
            }
        });
        engine.on_print(|text| debug!(output = text, "Chart script print"));
        engine.on_debug(|text, _, _| debug!(output = text, "Chart script debug"));
        engine
    }

    fn run(&self, code: &str, data: Value) -> anyhow::Result<Option<Value>> {
        let engine = self.engine();
        let mut scope = Scope::new();
        let data = rhai::serde::to_dynamic(&data)
            .map_err(|e| anyhow::anyhow!("Cannot expose data to script: {e}"))?;
        scope.push_dynamic("data", data);

        engine
            .run_with_scope(&mut scope, code)
            .map_err(|e| anyhow::anyhow!("Chart script failed: {e}"))?;

        let Some(fig) = scope.get_value::<Dynamic>("fig") else {
            return Ok(None);
        };
        if fig.is_unit() {
            return Ok(None);
        }
        let fig = rhai::serde::from_dynamic::<Value>(&fig)
            .map_err(|e| anyhow::anyhow!("Figure is not serializable: {e}"))?;
        Ok(Some(fig))
    }
}

#[async_trait::async_trait]
impl ChartSandbox for RhaiSandbox {
    async fn render(&self, code: &str, data: Value) -> anyhow::Result<Option<Value>> {
        let sandbox = self.clone();
        let code = code.to_string();
        // The progress hook stops runaway scripts; the outer timeout only
        // guards native calls that never report progress.
        let deadline = self.limits.timeout + Duration::from_secs(1);
        let task = tokio::task::spawn_blocking(move || sandbox.run(&code, data));
        tokio::time::timeout(deadline, task)
            .await
            .context("Chart script timed out")?
            .context("Chart script task failed")?
    }
}
