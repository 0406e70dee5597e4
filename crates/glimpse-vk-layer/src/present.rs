//! The present hook: frame accounting, overlay draw, patched present.
//!
//! `vkQueuePresentKHR` is the one place the layer does real work per
//! frame. Each swapchain in the present is handled in turn: tick its
//! timing tracker, draw the overlay over the about-to-present image, then
//! present that swapchain with the wait list swapped for the draw's signal
//! semaphore so the driver orders present after the overlay.

use std::sync::atomic::Ordering;

use ash::vk;
use ash::vk::Handle;
use tracing::warn;

use glimpse_core::draw::{FrameReadout, OverlayRenderer};
use glimpse_core::session_log::LogSample;
use glimpse_core::submit::{self, SubmitPlan};
use glimpse_core::CoreError;

use crate::device::QueueState;
use crate::runtime::Runtime;
use crate::swapchain::{ensure_buffer_capacity, OverlaySetup, SwapchainState};

fn vk_call<T>(call: &'static str, r: Result<T, vk::Result>) -> Result<T, CoreError> {
    r.map_err(|e| CoreError::DriverCall {
        call,
        code: e.as_raw(),
    })
}

#[no_mangle]
pub unsafe extern "C" fn vkQueuePresentKHR(
    queue: vk::Queue,
    p_present_info: *const vk::PresentInfoKHR<'_>,
) -> vk::Result {
    if p_present_info.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let rt = Runtime::get();
    let Some(queue_state) = rt.queues.lookup(queue.as_raw()) else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };

    if rt.enabled {
        rt.poll_control();
    }

    let info = unsafe { &*p_present_info };
    let count = info.swapchain_count as usize;
    let swapchains = unsafe { std::slice::from_raw_parts(info.p_swapchains, count) };
    let image_indices = unsafe { std::slice::from_raw_parts(info.p_image_indices, count) };
    let wait_semaphores = if info.p_wait_semaphores.is_null() {
        &[]
    } else {
        unsafe {
            std::slice::from_raw_parts(info.p_wait_semaphores, info.wait_semaphore_count as usize)
        }
    };

    let mut result = vk::Result::SUCCESS;
    for i in 0..count {
        // The application's binary semaphores may only be waited on once;
        // they go to whichever submission runs first for this present.
        let waits = if i == 0 { wait_semaphores } else { &[] };
        let state = rt.swapchains.lookup(swapchains[i].as_raw());

        let mut present_waits = waits;
        let mut draw_semaphore = [vk::Semaphore::null()];
        let mut drew = false;
        if let Some(state) = &state {
            if let Some(sem) = unsafe { frame_hook(rt, &queue_state, state, image_indices[i], waits) }
            {
                draw_semaphore[0] = sem;
                present_waits = &draw_semaphore;
                drew = true;
            }
        }

        if submit::present_rewrite(count as u32, drew) == submit::PresentRewrite::Forward {
            let r = unsafe {
                (queue_state.device.dispatch.swapchain.fp().queue_present_khr)(
                    queue,
                    p_present_info,
                )
            };
            if r != vk::Result::SUCCESS && result == vk::Result::SUCCESS {
                result = r;
            }
            continue;
        }

        // Copy the application's info so its p_next chain (present regions,
        // present IDs, display timing) reaches the driver, then narrow it to
        // this one swapchain.
        let indices = [image_indices[i]];
        let one = [swapchains[i]];
        let mut single = unsafe { *p_present_info };
        single.wait_semaphore_count = present_waits.len() as u32;
        single.p_wait_semaphores = present_waits.as_ptr();
        single.swapchain_count = 1;
        single.p_swapchains = one.as_ptr();
        single.p_image_indices = indices.as_ptr();
        single.p_results = std::ptr::null_mut();
        let r = unsafe {
            (queue_state.device.dispatch.swapchain.fp().queue_present_khr)(queue, &single)
        };
        if !info.p_results.is_null() {
            unsafe { *info.p_results.add(i) = r };
        }
        if r != vk::Result::SUCCESS && result == vk::Result::SUCCESS {
            result = r;
        }
    }

    {
        let mut pacer = rt.pacer.lock();
        if pacer.enabled() {
            pacer.pace();
        }
    }

    result
}

/// Per-swapchain frame work. Returns the semaphore the present must wait
/// on when the overlay drew, `None` for a passthrough present.
unsafe fn frame_hook(
    rt: &Runtime,
    queue_state: &QueueState,
    state: &SwapchainState,
    image_index: u32,
    waits: &[vk::Semaphore],
) -> Option<vk::Semaphore> {
    if !rt.enabled {
        return None;
    }
    let now_us = glimpse_common::time::now_us();
    let mut frame = state.frame.lock();
    let tick = frame
        .tracker
        .tick(now_us, rt.params().fps_sampling_period_us);
    if tick.sampling_period_elapsed {
        rt.refresh_telemetry();
    }

    let telemetry = rt.telemetry_snapshot();
    rt.log_frame(LogSample {
        fps: frame.tracker.fps(),
        frametime_us: tick.frame_time_us.unwrap_or(0),
        cpu_load: telemetry.cpu.load_percent,
        gpu_load: telemetry.gpu.load_percent,
        elapsed_us: 0,
    });

    // The very first present carries no usable interval yet; draw from the
    // second frame on.
    if !rt.hud_visible() || frame.tracker.frame_count() <= 1 {
        return None;
    }
    let setup = state.overlay.as_ref()?;

    let readout = FrameReadout {
        fps: frame.tracker.fps() as f64,
        frame_time_us: tick.frame_time_us.unwrap_or(0),
        cpu_load: telemetry.cpu.load_percent as f32,
        gpu_load: telemetry.gpu.load_percent as f32,
    };

    let frame = &mut *frame;
    frame.draw_data.clear();
    frame.draw_data.display_size = [state.extent.width as f32, state.extent.height as f32];
    frame
        .renderer
        .render(&rt.params(), &readout, &frame.tracker.ring, &mut frame.draw_data);
    if frame.draw_data.is_empty() {
        return None;
    }

    match unsafe { render_overlay(queue_state, state, setup, image_index, waits, frame) } {
        Ok(sem) => Some(sem),
        Err(e) => {
            warn!("overlay draw failed: {e}");
            None
        }
    }
}

unsafe fn render_overlay(
    queue_state: &QueueState,
    state: &SwapchainState,
    setup: &OverlaySetup,
    image_index: u32,
    waits: &[vk::Semaphore],
    frame: &mut crate::swapchain::FrameState,
) -> Result<vk::Semaphore, CoreError> {
    let dev = &queue_state.device;
    let d = &dev.dispatch.table;
    let graphics = dev
        .graphics
        .ok_or(CoreError::SwapchainSetup("no graphics queue".to_owned()))?;

    let mut records = setup.records.lock();
    let record = records.acquire(
        |r| vk_call("vkGetFenceStatus", unsafe { d.get_fence_status(r.fence) }),
        || unsafe { setup.create_record(dev) },
    )?;
    vk_call("vkResetFences", unsafe { d.reset_fences(&[record.fence]) })?;

    // Upload geometry into the record's host-visible buffers.
    let vtx_bytes = frame.draw_data.vertex_bytes() as vk::DeviceSize;
    let idx_bytes = frame.draw_data.index_bytes() as vk::DeviceSize;
    unsafe {
        ensure_buffer_capacity(dev, &mut record.vertex, vtx_bytes, vk::BufferUsageFlags::VERTEX_BUFFER)?;
        ensure_buffer_capacity(dev, &mut record.index, idx_bytes, vk::BufferUsageFlags::INDEX_BUFFER)?;

        let ptr = vk_call(
            "vkMapMemory",
            d.map_memory(record.vertex.memory, 0, vtx_bytes, vk::MemoryMapFlags::empty()),
        )?;
        std::ptr::copy_nonoverlapping(
            frame.draw_data.vertices.as_ptr() as *const u8,
            ptr as *mut u8,
            vtx_bytes as usize,
        );
        d.unmap_memory(record.vertex.memory);

        let ptr = vk_call(
            "vkMapMemory",
            d.map_memory(record.index.memory, 0, idx_bytes, vk::MemoryMapFlags::empty()),
        )?;
        std::ptr::copy_nonoverlapping(
            frame.draw_data.indices.as_ptr() as *const u8,
            ptr as *mut u8,
            idx_bytes as usize,
        );
        d.unmap_memory(record.index.memory);
    }

    // Record the draw.
    let cb = record.command_buffer;
    let begin = vk::CommandBufferBeginInfo::default()
        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    vk_call("vkBeginCommandBuffer", unsafe { d.begin_command_buffer(cb, &begin) })?;

    if !setup.atlas_uploaded.swap(true, Ordering::Relaxed) {
        unsafe { record_atlas_upload(dev, setup, cb) };
    }

    let subresource = vk::ImageSubresourceRange::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .level_count(1)
        .layer_count(1);
    let to_attachment = vk::ImageMemoryBarrier::default()
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .old_layout(vk::ImageLayout::PRESENT_SRC_KHR)
        .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(setup.images[image_index as usize])
        .subresource_range(subresource);
    unsafe {
        d.cmd_pipeline_barrier(
            cb,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_attachment],
        )
    };

    let render_area = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent: state.extent,
    };
    let rp_begin = vk::RenderPassBeginInfo::default()
        .render_pass(setup.render_pass)
        .framebuffer(setup.framebuffers[image_index as usize])
        .render_area(render_area);
    unsafe {
        d.cmd_begin_render_pass(cb, &rp_begin, vk::SubpassContents::INLINE);
        d.cmd_bind_pipeline(cb, vk::PipelineBindPoint::GRAPHICS, setup.pipeline);
        d.cmd_bind_descriptor_sets(
            cb,
            vk::PipelineBindPoint::GRAPHICS,
            setup.pipeline_layout,
            0,
            &[setup.descriptor_set],
            &[],
        );
        d.cmd_bind_vertex_buffers(cb, 0, &[record.vertex.buffer], &[0]);
        d.cmd_bind_index_buffer(cb, record.index.buffer, 0, vk::IndexType::UINT16);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: state.extent.width as f32,
            height: state.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        d.cmd_set_viewport(cb, 0, &[viewport]);

        // Pixel space to clip space.
        let push: [f32; 4] = [
            2.0 / state.extent.width as f32,
            2.0 / state.extent.height as f32,
            -1.0,
            -1.0,
        ];
        d.cmd_push_constants(
            cb,
            setup.pipeline_layout,
            vk::ShaderStageFlags::VERTEX,
            0,
            bytemuck_bytes(&push),
        );

        for cmd in &frame.draw_data.commands {
            let x = cmd.clip_min[0].max(0.0) as i32;
            let y = cmd.clip_min[1].max(0.0) as i32;
            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x, y },
                extent: vk::Extent2D {
                    width: (cmd.clip_max[0] - cmd.clip_min[0]).max(0.0) as u32,
                    height: (cmd.clip_max[1] - cmd.clip_min[1]).max(0.0) as u32,
                },
            };
            d.cmd_set_scissor(cb, 0, &[scissor]);
            d.cmd_draw_indexed(cb, cmd.index_count, 1, cmd.index_offset, cmd.vertex_offset, 0);
        }

        d.cmd_end_render_pass(cb);
    }
    vk_call("vkEndCommandBuffer", unsafe { d.end_command_buffer(cb) })?;

    // Submit; the present queue and the graphics queue may differ.
    let plan = submit::plan(queue_state.queue == graphics.queue, waits.len() as u32);
    let cbs = [cb];
    let signal = [record.semaphore];
    match plan {
        SubmitPlan::Direct => {
            let stages = vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; waits.len()];
            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(waits)
                .wait_dst_stage_mask(&stages)
                .command_buffers(&cbs)
                .signal_semaphores(&signal);
            vk_call("vkQueueSubmit", unsafe {
                d.queue_submit(graphics.queue, &[submit_info], record.fence)
            })?;
        }
        SubmitPlan::CrossQueueHandoff => {
            let handoff = [record.handoff_semaphore];
            let first = vk::SubmitInfo::default().signal_semaphores(&handoff);
            vk_call("vkQueueSubmit", unsafe {
                d.queue_submit(queue_state.queue, &[first], vk::Fence::null())
            })?;
            let stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let second = vk::SubmitInfo::default()
                .wait_semaphores(&handoff)
                .wait_dst_stage_mask(&stages)
                .command_buffers(&cbs)
                .signal_semaphores(&signal);
            vk_call("vkQueueSubmit", unsafe {
                d.queue_submit(graphics.queue, &[second], record.fence)
            })?;
        }
    }

    Ok(record.semaphore)
}

unsafe fn record_atlas_upload(
    dev: &crate::device::DeviceState,
    setup: &OverlaySetup,
    cb: vk::CommandBuffer,
) {
    let d = &dev.dispatch.table;
    let subresource = vk::ImageSubresourceRange::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .level_count(1)
        .layer_count(1);

    let to_transfer = vk::ImageMemoryBarrier::default()
        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(setup.atlas_image)
        .subresource_range(subresource);
    let region = vk::BufferImageCopy::default()
        .image_subresource(
            vk::ImageSubresourceLayers::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .layer_count(1),
        )
        .image_extent(vk::Extent3D {
            width: 1,
            height: 1,
            depth: 1,
        });
    let to_sampled = vk::ImageMemoryBarrier::default()
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::SHADER_READ)
        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(setup.atlas_image)
        .subresource_range(subresource);

    unsafe {
        d.cmd_pipeline_barrier(
            cb,
            vk::PipelineStageFlags::HOST,
            vk::PipelineStageFlags::TRANSFER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_transfer],
        );
        d.cmd_copy_buffer_to_image(
            cb,
            setup.atlas_staging.buffer,
            setup.atlas_image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );
        d.cmd_pipeline_barrier(
            cb,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[to_sampled],
        );
    }
}

fn bytemuck_bytes(push: &[f32; 4]) -> &[u8] {
    bytemuck::cast_slice(push)
}
