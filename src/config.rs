use crate::utils::env_var_as_bool;

pub const VALIDATION_LAYER_ENV_VAR: &str = "RTGEOM_VALIDATION_LAYER";
pub const GPUAV_ENV_VAR: &str = "RTGEOM_GPUAV";

/// Settings for creating a [`crate::vulkan_abstraction::Core`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub with_validation_layer: bool,
    /// gpu assisted validation, only meaningful together with the validation layer
    pub with_gpuav: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            with_validation_layer: cfg!(debug_assertions),
            with_gpuav: false,
        }
    }
}

impl Config {
    /// Defaults, overridden by `RTGEOM_VALIDATION_LAYER` and `RTGEOM_GPUAV` when they hold an integer.
    pub fn from_env() -> Self {
        Self::default().override_with(env_var_as_bool(VALIDATION_LAYER_ENV_VAR), env_var_as_bool(GPUAV_ENV_VAR))
    }

    fn override_with(self, with_validation_layer: Option<bool>, with_gpuav: Option<bool>) -> Self {
        Self {
            with_validation_layer: with_validation_layer.unwrap_or(self.with_validation_layer),
            with_gpuav: with_gpuav.unwrap_or(self.with_gpuav),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_replace_what_is_set() {
        let base = Config { with_validation_layer: true, with_gpuav: false };

        assert_eq!(base.override_with(None, None), base);
        assert_eq!(
            base.override_with(Some(false), None),
            Config { with_validation_layer: false, with_gpuav: false }
        );
        assert_eq!(
            base.override_with(None, Some(true)),
            Config { with_validation_layer: true, with_gpuav: true }
        );
    }
}
