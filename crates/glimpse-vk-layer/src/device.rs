//! Device-level hooks: queue mapping at creation, command-buffer tracking.

use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use tracing::{debug, error, info};

use glimpse_core::engine::{device_name_string, driver_version_string, EngineIdentity};

use crate::chain::{self, PfnSetDeviceLoaderData};
use crate::dispatch::DeviceDispatch;
use crate::runtime::Runtime;

#[derive(Clone, Copy)]
pub struct GraphicsQueue {
    pub queue: vk::Queue,
    pub family_index: u32,
}

pub struct DeviceState {
    pub handle: vk::Device,
    pub physical_device: vk::PhysicalDevice,
    pub dispatch: DeviceDispatch,
    pub props: vk::PhysicalDeviceProperties,
    pub memory_props: vk::PhysicalDeviceMemoryProperties,
    pub engine: EngineIdentity,
    /// First queue from a graphics-capable family; the overlay draws here.
    pub graphics: Option<GraphicsQueue>,
    queue_handles: Vec<u64>,
    pub set_loader_data: Option<PfnSetDeviceLoaderData>,
}

pub struct QueueState {
    pub queue: vk::Queue,
    pub family_index: u32,
    pub device: Arc<DeviceState>,
}

pub struct CommandBufferState {
    pub pool: vk::CommandPool,
    pub device: vk::Device,
}

#[no_mangle]
pub unsafe extern "C" fn vkCreateDevice(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_device: *mut vk::Device,
) -> vk::Result {
    if p_create_info.is_null() || p_device.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }

    let ci = unsafe { &*p_create_info };
    let Some((gipa, gdpa)) = (unsafe { chain::pop_device_chain(ci.p_next) }) else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };
    let next_create: vk::PFN_vkCreateDevice =
        match unsafe { chain::load(gipa, vk::Instance::null(), b"vkCreateDevice\0") } {
            Some(f) => f,
            None => return vk::Result::ERROR_INITIALIZATION_FAILED,
        };

    let result = unsafe { next_create(physical_device, p_create_info, p_allocator, p_device) };
    if result != vk::Result::SUCCESS {
        return result;
    }

    let rt = Runtime::get();
    let Some(instance_state) = rt.instances.lookup(physical_device.as_raw()) else {
        return result;
    };

    let device = unsafe { *p_device };
    let dispatch = unsafe { DeviceDispatch::load(gdpa, &instance_state.dispatch.table, device) };
    let instance_table = &instance_state.dispatch.table;
    let props = unsafe { instance_table.get_physical_device_properties(physical_device) };
    let memory_props =
        unsafe { instance_table.get_physical_device_memory_properties(physical_device) };
    let family_props =
        unsafe { instance_table.get_physical_device_queue_family_properties(physical_device) };
    let set_loader_data = unsafe { chain::find_set_device_loader_data(ci.p_next) };

    // Fetch every queue the application asked for, and remember the first
    // graphics-capable one for the overlay's own submissions.
    let mut graphics = None;
    let mut queues = Vec::new();
    if !ci.p_queue_create_infos.is_null() {
        let queue_cis = unsafe {
            std::slice::from_raw_parts(
                ci.p_queue_create_infos,
                ci.queue_create_info_count as usize,
            )
        };
        for qci in queue_cis {
            let family = qci.queue_family_index;
            let is_graphics = family_props
                .get(family as usize)
                .is_some_and(|p| p.queue_flags.contains(vk::QueueFlags::GRAPHICS));
            for i in 0..qci.queue_count {
                let queue = unsafe { dispatch.table.get_device_queue(family, i) };
                queues.push((queue, family));
                if graphics.is_none() && is_graphics {
                    graphics = Some(GraphicsQueue {
                        queue,
                        family_index: family,
                    });
                }
            }
        }
    }

    let gpu = device_name_string(&props.device_name);
    let driver = driver_version_string(props.vendor_id, props.driver_version);
    info!(gpu = %gpu, driver = %driver, "device created");
    rt.note_gpu(gpu.clone(), driver);
    rt.set_control_greeting(gpu);

    let state = Arc::new(DeviceState {
        handle: device,
        physical_device,
        dispatch,
        props,
        memory_props,
        engine: instance_state.engine.clone(),
        graphics,
        queue_handles: queues.iter().map(|(q, _)| q.as_raw()).collect(),
        set_loader_data,
    });
    rt.devices.register(device.as_raw(), state.clone());
    for (queue, family_index) in queues {
        rt.queues.register(
            queue.as_raw(),
            Arc::new(QueueState {
                queue,
                family_index,
                device: state.clone(),
            }),
        );
    }

    vk::Result::SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn vkDestroyDevice(
    device: vk::Device,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let rt = Runtime::get();
    let Some(state) = rt.devices.unregister(device.as_raw()) else {
        error!("destroying unknown device");
        return;
    };
    for handle in &state.queue_handles {
        rt.queues.unregister(*handle);
    }
    // Command buffers the application never freed die with the device;
    // their contexts must not survive into a recycled handle value.
    rt.command_buffers.sweep(|cb| cb.device == device);
    debug!("device destroyed");
    unsafe { state.dispatch.table.destroy_device(p_allocator.as_ref()) };
}

#[no_mangle]
pub unsafe extern "C" fn vkDestroyCommandPool(
    device: vk::Device,
    command_pool: vk::CommandPool,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let rt = Runtime::get();
    let Some(state) = rt.devices.lookup(device.as_raw()) else {
        return;
    };
    // Destroying a pool implicitly frees every buffer allocated from it.
    rt.command_buffers
        .sweep(|cb| cb.device == device && cb.pool == command_pool);
    unsafe {
        (state.dispatch.table.fp_v1_0().destroy_command_pool)(device, command_pool, p_allocator)
    };
}

#[no_mangle]
pub unsafe extern "C" fn vkAllocateCommandBuffers(
    device: vk::Device,
    p_allocate_info: *const vk::CommandBufferAllocateInfo<'_>,
    p_command_buffers: *mut vk::CommandBuffer,
) -> vk::Result {
    let rt = Runtime::get();
    let Some(state) = rt.devices.lookup(device.as_raw()) else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };

    let result = unsafe {
        (state.dispatch.table.fp_v1_0().allocate_command_buffers)(
            device,
            p_allocate_info,
            p_command_buffers,
        )
    };
    if result == vk::Result::SUCCESS && !p_allocate_info.is_null() {
        let info = unsafe { &*p_allocate_info };
        for i in 0..info.command_buffer_count as usize {
            let cb = unsafe { *p_command_buffers.add(i) };
            rt.command_buffers.register(
                cb.as_raw(),
                Arc::new(CommandBufferState {
                    pool: info.command_pool,
                    device,
                }),
            );
        }
    }
    result
}

#[no_mangle]
pub unsafe extern "C" fn vkFreeCommandBuffers(
    device: vk::Device,
    command_pool: vk::CommandPool,
    command_buffer_count: u32,
    p_command_buffers: *const vk::CommandBuffer,
) {
    let rt = Runtime::get();
    let Some(state) = rt.devices.lookup(device.as_raw()) else {
        return;
    };
    if !p_command_buffers.is_null() {
        let cbs =
            unsafe { std::slice::from_raw_parts(p_command_buffers, command_buffer_count as usize) };
        for cb in cbs {
            // Freeing an untracked or already-freed buffer is tolerated; the
            // registry treats it as a no-op.
            rt.command_buffers.unregister(cb.as_raw());
        }
    }
    unsafe {
        (state.dispatch.table.fp_v1_0().free_command_buffers)(
            device,
            command_pool,
            command_buffer_count,
            p_command_buffers,
        )
    };
}
