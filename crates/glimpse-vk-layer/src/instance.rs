//! Instance-level hooks.

use std::ffi::CStr;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use tracing::{debug, info};

use glimpse_core::engine::{identify_engine, EngineIdentity};

use crate::chain;
use crate::dispatch::InstanceDispatch;
use crate::runtime::Runtime;

pub struct InstanceState {
    pub handle: vk::Instance,
    pub dispatch: InstanceDispatch,
    pub engine: EngineIdentity,
    pub api_version: u32,
}

#[no_mangle]
pub unsafe extern "C" fn vkCreateInstance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    if p_create_info.is_null() || p_instance.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }

    let ci = unsafe { &*p_create_info };
    let gipa = match unsafe { chain::pop_instance_chain(ci.p_next) } {
        Some(gipa) => gipa,
        None => return vk::Result::ERROR_INITIALIZATION_FAILED,
    };
    let next_create: vk::PFN_vkCreateInstance =
        match unsafe { chain::load(gipa, vk::Instance::null(), b"vkCreateInstance\0") } {
            Some(f) => f,
            None => return vk::Result::ERROR_INITIALIZATION_FAILED,
        };

    let result = unsafe { next_create(p_create_info, p_allocator, p_instance) };
    if result != vk::Result::SUCCESS {
        return result;
    }

    let rt = Runtime::get();
    let (engine, api_version) = if ci.p_application_info.is_null() {
        (identify_engine(None, 0), 0)
    } else {
        let ai = unsafe { &*ci.p_application_info };
        let name = if ai.p_engine_name.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(ai.p_engine_name) }.to_string_lossy())
        };
        (
            identify_engine(name.as_deref(), ai.engine_version),
            ai.api_version,
        )
    };

    let instance = unsafe { *p_instance };
    let dispatch = unsafe { InstanceDispatch::load(gipa, instance) };
    info!(engine = %engine.name, "instance created");
    rt.instances.register(
        instance.as_raw(),
        Arc::new(InstanceState {
            handle: instance,
            dispatch,
            engine,
            api_version,
        }),
    );

    vk::Result::SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn vkDestroyInstance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let rt = Runtime::get();
    let Some(state) = rt.instances.unregister(instance.as_raw()) else {
        return;
    };
    debug!("instance destroyed");
    unsafe {
        state
            .dispatch
            .table
            .destroy_instance(p_allocator.as_ref())
    };
}

/// Physical devices dispatch through their owning instance, so each handle
/// gets aliased to the instance context for the `vkCreateDevice` lookup.
#[no_mangle]
pub unsafe extern "C" fn vkEnumeratePhysicalDevices(
    instance: vk::Instance,
    p_count: *mut u32,
    p_physical_devices: *mut vk::PhysicalDevice,
) -> vk::Result {
    let rt = Runtime::get();
    let Some(state) = rt.instances.lookup(instance.as_raw()) else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };

    let result = unsafe {
        (state.dispatch.table.fp_v1_0().enumerate_physical_devices)(
            instance,
            p_count,
            p_physical_devices,
        )
    };

    if (result == vk::Result::SUCCESS || result == vk::Result::INCOMPLETE)
        && !p_physical_devices.is_null()
    {
        let id = rt.instances.id_of(instance.as_raw());
        if let Some(id) = id {
            let count = unsafe { *p_count } as usize;
            for i in 0..count {
                let pd = unsafe { *p_physical_devices.add(i) };
                rt.instances.alias(pd.as_raw(), id);
            }
        }
    }

    result
}
