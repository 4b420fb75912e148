use std::ffi::CStr;

use ash::{Entry, ext, vk};

use crate::error::SrResult;

pub struct Instance {
    instance: ash::Instance,
}

impl Instance {
    pub const VALIDATION_LAYER_NAME: &'static CStr = c"VK_LAYER_KHRONOS_validation";

    fn check_validation_layer_support(entry: &Entry) -> SrResult<bool> {
        let layers_props = unsafe { entry.enumerate_instance_layer_properties() }?;

        let supports_validation_layer = layers_props
            .iter()
            .any(|p| p.layer_name_as_c_str().is_ok_and(|name| name == Self::VALIDATION_LAYER_NAME));

        Ok(supports_validation_layer)
    }

    pub fn new(entry: &ash::Entry, with_validation_layer: bool, with_gpuav: bool) -> SrResult<Self> {
        // 1.2 is enough for buffer device addresses; acceleration structures come from extensions
        let application_info = vk::ApplicationInfo::default()
            .application_name(c"rtgeom")
            .api_version(vk::make_api_version(0, 1, 2, 0));

        let enable_validation_layer = if with_validation_layer {
            if Self::check_validation_layer_support(entry)? {
                log::info!("Validation layer enabled");
                true
            } else {
                log::warn!("No validation layer support; continuing without validation layer...");
                false
            }
        } else {
            log::debug!("validation layer disabled");
            false
        };

        let layer_names = if enable_validation_layer { vec![Self::VALIDATION_LAYER_NAME.as_ptr()] } else { vec![] };

        // VK_EXT_layer_settings is used to configure the validation layer
        let instance_extensions =
            if enable_validation_layer { vec![ext::layer_settings::NAME.as_ptr()] } else { vec![] };

        let validation_setting = |name: &'static CStr, v: bool| {
            let value: &'static vk::Bool32 = if v { &vk::TRUE } else { &vk::FALSE };
            let mut setting = vk::LayerSettingEXT::default()
                .layer_name(Self::VALIDATION_LAYER_NAME)
                .setting_name(name)
                .ty(vk::LayerSettingTypeEXT::BOOL32);
            // one BOOL32 value, not one per byte
            setting.value_count = 1;
            setting.p_values = (value as *const vk::Bool32).cast();
            setting
        };
        let settings = [
            // Khronos Validation layer recommends not to enable both GPU Assisted Validation (gpuav_enable)
            // and Normal Core Check Validation (validate_core), as it will be very slow.
            validation_setting(c"validate_core", !with_gpuav),
            validation_setting(c"gpuav_enable", with_gpuav),
            validation_setting(c"validate_sync", true),
            validation_setting(c"validate_best_practices", true),
        ];
        let mut layer_settings_create_info = vk::LayerSettingsCreateInfoEXT::default().settings(&settings);

        let instance_create_info = vk::InstanceCreateInfo::default()
            .application_info(&application_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&instance_extensions);

        let instance_create_info = if enable_validation_layer {
            instance_create_info.push_next(&mut layer_settings_create_info)
        } else {
            instance_create_info
        };

        let instance = unsafe { entry.create_instance(&instance_create_info, None) }?;
        Ok(Self { instance })
    }
    pub fn inner(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}
