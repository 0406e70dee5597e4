//! Glimpse Vulkan layer
//!
//! This cdylib implements an implicit Vulkan layer that draws a
//! performance overlay over every presented frame. The loader routes the
//! intercepted entry points through the layer; everything else falls
//! through to the next layer in the chain.

use std::ffi::{c_char, CStr};

use ash::vk;
use ash::vk::Handle;

pub mod chain;
pub mod device;
pub mod dispatch;
pub mod instance;
pub mod present;
pub mod runtime;
pub mod shaders;
pub mod swapchain;

use runtime::Runtime;

/// Entry point named by the layer manifest.
#[no_mangle]
pub unsafe extern "C" fn Glimpse_GetInstanceProcAddr(
    vk_instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    if p_name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(p_name) }.to_str().ok()?;

    match name {
        "vkGetInstanceProcAddr" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                Glimpse_GetInstanceProcAddr as *const (),
            ) })
        }
        "vkGetDeviceProcAddr" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                Glimpse_GetDeviceProcAddr as *const (),
            ) })
        }

        // ── Instance ────────────────────────────────────────
        "vkCreateInstance" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                instance::vkCreateInstance as *const (),
            ) })
        }
        "vkDestroyInstance" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                instance::vkDestroyInstance as *const (),
            ) })
        }
        "vkEnumeratePhysicalDevices" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                instance::vkEnumeratePhysicalDevices as *const (),
            ) })
        }

        // ── Device ──────────────────────────────────────────
        "vkCreateDevice" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                device::vkCreateDevice as *const (),
            ) })
        }

        // Device-level hooks are resolvable through GIPA too.
        _ => match device_hook(name) {
            Some(f) => Some(f),
            None => unsafe { next_instance_proc(vk_instance, p_name) },
        },
    }
}

/// Device dispatch counterpart of [`Glimpse_GetInstanceProcAddr`].
#[no_mangle]
pub unsafe extern "C" fn Glimpse_GetDeviceProcAddr(
    vk_device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    if p_name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(p_name) }.to_str().ok()?;

    if name == "vkGetDeviceProcAddr" {
        return Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
            Glimpse_GetDeviceProcAddr as *const (),
        ) });
    }
    match device_hook(name) {
        Some(f) => Some(f),
        None => {
            let rt = Runtime::get();
            let state = rt.devices.lookup(vk_device.as_raw())?;
            unsafe { (state.dispatch.gdpa)(vk_device, p_name) }
        }
    }
}

fn device_hook(name: &str) -> vk::PFN_vkVoidFunction {
    match name {
        "vkDestroyDevice" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                device::vkDestroyDevice as *const (),
            ) })
        }
        "vkAllocateCommandBuffers" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                device::vkAllocateCommandBuffers as *const (),
            ) })
        }
        "vkFreeCommandBuffers" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                device::vkFreeCommandBuffers as *const (),
            ) })
        }
        "vkDestroyCommandPool" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                device::vkDestroyCommandPool as *const (),
            ) })
        }
        "vkCreateSwapchainKHR" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                swapchain::vkCreateSwapchainKHR as *const (),
            ) })
        }
        "vkDestroySwapchainKHR" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                swapchain::vkDestroySwapchainKHR as *const (),
            ) })
        }
        "vkQueuePresentKHR" => {
            Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(
                present::vkQueuePresentKHR as *const (),
            ) })
        }
        _ => None,
    }
}

/// Not intercepted: hand the name to the next layer if the instance is
/// known, otherwise there is nowhere to send it.
unsafe fn next_instance_proc(
    vk_instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    if vk_instance == vk::Instance::null() {
        return None;
    }
    let rt = Runtime::get();
    let state = rt.instances.lookup(vk_instance.as_raw())?;
    unsafe { (state.dispatch.gipa)(vk_instance, p_name) }
}
