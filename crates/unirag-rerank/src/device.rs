use candle_core::Device;
use tracing::info;

use unirag_core::error::{Result, RetrievalError};

/// Map the configured device name onto whatever this build supports.
/// Accelerators are opt-in cargo features; asking for one that is not
/// compiled in is a configuration error, not a silent CPU fallback.
pub fn select_device(name: &str) -> Result<Device> {
    match name {
        "cpu" => {
            info!("reranker device: CPU");
            Ok(Device::Cpu)
        }
        #[cfg(feature = "metal")]
        "metal" => {
            info!("reranker device: Metal");
            Device::new_metal(0)
                .map_err(|e| RetrievalError::backend("failed to initialize Metal device", e))
        }
        #[cfg(feature = "cuda")]
        "cuda" => {
            info!("reranker device: CUDA");
            Device::new_cuda(0)
                .map_err(|e| RetrievalError::backend("failed to initialize CUDA device", e))
        }
        other => Err(RetrievalError::Configuration(format!(
            "unsupported rerank device '{other}' (is the matching cargo feature enabled?)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_is_always_available() {
        assert!(matches!(select_device("cpu"), Ok(Device::Cpu)));
    }

    #[test]
    fn unknown_device_is_a_configuration_error() {
        let err = select_device("tpu").expect_err("must fail");
        assert!(matches!(err, RetrievalError::Configuration(_)));
    }
}
