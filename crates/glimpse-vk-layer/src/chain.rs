//! Loader layer-chain structures.
//!
//! The Vulkan loader threads a `VkLayer*CreateInfo` through the pNext chain
//! of `vkCreateInstance` and `vkCreateDevice`. Each layer pops its link to
//! find the next layer's proc-addr loaders, advances the chain, then calls
//! down. These structs come from `vk_layer.h` and are not part of ash.

use std::ffi::{c_char, c_void};

use ash::vk;

pub const LAYER_LINK_INFO: u32 = 0;
pub const LOADER_DATA_CALLBACK: u32 = 1;

pub type PfnSetDeviceLoaderData =
    unsafe extern "C" fn(device: vk::Device, object: *mut c_void) -> vk::Result;

#[repr(C)]
pub struct VkLayerInstanceLink {
    pub p_next: *mut VkLayerInstanceLink,
    pub pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub pfn_next_get_physical_device_proc_addr: Option<unsafe extern "C" fn()>,
}

#[repr(C)]
pub union VkLayerInstanceCreateInfoU {
    pub p_layer_info: *mut VkLayerInstanceLink,
    pub pfn_set_instance_loader_data: Option<unsafe extern "C" fn()>,
}

#[repr(C)]
pub struct VkLayerInstanceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: u32,
    pub u: VkLayerInstanceCreateInfoU,
}

#[repr(C)]
pub struct VkLayerDeviceLink {
    pub p_next: *mut VkLayerDeviceLink,
    pub pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub pfn_next_get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
}

#[repr(C)]
pub union VkLayerDeviceCreateInfoU {
    pub p_layer_info: *mut VkLayerDeviceLink,
    pub pfn_set_device_loader_data: PfnSetDeviceLoaderData,
}

#[repr(C)]
pub struct VkLayerDeviceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: u32,
    pub u: VkLayerDeviceCreateInfoU,
}

/// Find the instance chain link, return the next layer's GIPA and advance
/// the chain so the layer below sees its own link at the front.
///
/// # Safety
/// `p_next` must be the pNext chain of a live `VkInstanceCreateInfo` as
/// handed to the layer by the loader.
pub unsafe fn pop_instance_chain(p_next: *const c_void) -> Option<vk::PFN_vkGetInstanceProcAddr> {
    let mut cur = p_next as *mut VkLayerInstanceCreateInfo;
    while !cur.is_null() {
        // SAFETY: loader-owned chain, every node starts with sType/pNext.
        let node = unsafe { &mut *cur };
        if node.s_type == vk::StructureType::LOADER_INSTANCE_CREATE_INFO
            && node.function == LAYER_LINK_INFO
        {
            let link = unsafe { node.u.p_layer_info };
            if link.is_null() {
                return None;
            }
            let gipa = unsafe { (*link).pfn_next_get_instance_proc_addr };
            node.u.p_layer_info = unsafe { (*link).p_next };
            return Some(gipa);
        }
        cur = node.p_next as *mut VkLayerInstanceCreateInfo;
    }
    None
}

/// Same as [`pop_instance_chain`] for `vkCreateDevice`; the device link
/// also carries the next layer's GDPA.
///
/// # Safety
/// `p_next` must be the pNext chain of a live `VkDeviceCreateInfo`.
pub unsafe fn pop_device_chain(
    p_next: *const c_void,
) -> Option<(vk::PFN_vkGetInstanceProcAddr, vk::PFN_vkGetDeviceProcAddr)> {
    let mut cur = p_next as *mut VkLayerDeviceCreateInfo;
    while !cur.is_null() {
        let node = unsafe { &mut *cur };
        if node.s_type == vk::StructureType::LOADER_DEVICE_CREATE_INFO
            && node.function == LAYER_LINK_INFO
        {
            let link = unsafe { node.u.p_layer_info };
            if link.is_null() {
                return None;
            }
            let gipa = unsafe { (*link).pfn_next_get_instance_proc_addr };
            let gdpa = unsafe { (*link).pfn_next_get_device_proc_addr };
            node.u.p_layer_info = unsafe { (*link).p_next };
            return Some((gipa, gdpa));
        }
        cur = node.p_next as *mut VkLayerDeviceCreateInfo;
    }
    None
}

/// Find the loader-data callback in the device chain. The loader uses it to
/// stamp its dispatch pointer into objects the layer creates itself.
///
/// # Safety
/// `p_next` must be the pNext chain of a live `VkDeviceCreateInfo`.
pub unsafe fn find_set_device_loader_data(p_next: *const c_void) -> Option<PfnSetDeviceLoaderData> {
    let mut cur = p_next as *const VkLayerDeviceCreateInfo;
    while !cur.is_null() {
        let node = unsafe { &*cur };
        if node.s_type == vk::StructureType::LOADER_DEVICE_CREATE_INFO
            && node.function == LOADER_DATA_CALLBACK
        {
            return Some(unsafe { node.u.pfn_set_device_loader_data });
        }
        cur = node.p_next as *const VkLayerDeviceCreateInfo;
    }
    None
}

/// Resolve one function through a GIPA, transmuting to the target type.
///
/// # Safety
/// `T` must be the correct function pointer type for `name`.
pub unsafe fn load<T>(gipa: vk::PFN_vkGetInstanceProcAddr, instance: vk::Instance, name: &[u8]) -> Option<T> {
    debug_assert!(name.ends_with(b"\0"));
    let raw = unsafe { gipa(instance, name.as_ptr() as *const c_char) }?;
    // SAFETY: caller matches T to the entry point being resolved.
    Some(unsafe { std::mem::transmute_copy::<_, T>(&raw) })
}
