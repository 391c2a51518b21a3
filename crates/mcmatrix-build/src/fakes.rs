//! Test doubles for the builder seam (testing only).

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use mcmatrix_core::Result;

use crate::builder::{BuildOutput, Builder};

/// A [`Builder`] that fabricates its product file instead of compiling.
///
/// Each invocation pops the next scripted outcome (defaulting to success
/// once the script runs out). On success it writes a placeholder product
/// file into the module's build output directory, the way a real builder
/// would leave one behind.
pub struct ScriptedBuilder {
    product_name: String,
    build_output_dir: PathBuf,
    outcomes: Mutex<VecDeque<bool>>,
    invocations: Mutex<Vec<PathBuf>>,
}

impl ScriptedBuilder {
    /// Always-succeeding builder producing `product_name` under
    /// `build_output_dir` (relative to the module directory).
    pub fn succeeding(product_name: &str, build_output_dir: &str) -> Self {
        Self::scripted(product_name, build_output_dir, &[])
    }

    /// Builder with scripted per-invocation outcomes; `true` is success.
    pub fn scripted(product_name: &str, build_output_dir: &str, outcomes: &[bool]) -> Self {
        Self {
            product_name: product_name.to_string(),
            build_output_dir: PathBuf::from(build_output_dir),
            outcomes: Mutex::new(outcomes.iter().copied().collect()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Module directories the builder was invoked on, in order.
    pub fn invocations(&self) -> Vec<PathBuf> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl Builder for ScriptedBuilder {
    async fn build(&self, module_dir: &Path) -> Result<BuildOutput> {
        self.invocations
            .lock()
            .unwrap()
            .push(module_dir.to_path_buf());

        let success = self.outcomes.lock().unwrap().pop_front().unwrap_or(true);
        if success {
            let dir = module_dir.join(&self.build_output_dir);
            std::fs::create_dir_all(&dir)?;
            std::fs::write(dir.join(&self.product_name), b"archive bytes")?;
        }

        Ok(BuildOutput {
            exit_code: if success { 0 } else { 1 },
            stdout: String::new(),
            stderr: if success {
                String::new()
            } else {
                "scripted failure".to_string()
            },
            duration_ms: 1,
            success,
        })
    }
}
