//! Downward dispatch tables.
//!
//! Every driver call goes through function pointers resolved from the next
//! layer's GIPA/GDPA, never through a statically linked loader. ash's
//! generated tables do the bulk of the loading.

use ash::vk;

pub struct InstanceDispatch {
    pub gipa: vk::PFN_vkGetInstanceProcAddr,
    pub table: ash::Instance,
}

impl InstanceDispatch {
    /// Build the instance table by loading through the next layer's GIPA.
    ///
    /// # Safety
    /// `instance` must be the handle returned by the next layer's
    /// `vkCreateInstance`, and `gipa` the GIPA popped from its chain.
    pub unsafe fn load(gipa: vk::PFN_vkGetInstanceProcAddr, instance: vk::Instance) -> Self {
        let static_fn = ash::StaticFn {
            get_instance_proc_addr: gipa,
        };
        let table = unsafe { ash::Instance::load(&static_fn, instance) };
        Self { gipa, table }
    }
}

pub struct DeviceDispatch {
    pub gdpa: vk::PFN_vkGetDeviceProcAddr,
    pub table: ash::Device,
    pub swapchain: ash::khr::swapchain::Device,
}

impl DeviceDispatch {
    /// Build the device tables through the chain's GDPA.
    ///
    /// # Safety
    /// `device` must be the handle returned by the next layer's
    /// `vkCreateDevice`; `instance_table` the owning instance's dispatch.
    pub unsafe fn load(
        gdpa: vk::PFN_vkGetDeviceProcAddr,
        instance_table: &ash::Instance,
        device: vk::Device,
    ) -> Self {
        let table = unsafe { ash::Device::load(instance_table.fp_v1_0(), device) };
        let swapchain = ash::khr::swapchain::Device::new(instance_table, &table);
        Self {
            gdpa,
            table,
            swapchain,
        }
    }
}
