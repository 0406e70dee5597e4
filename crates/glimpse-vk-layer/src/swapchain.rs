//! Swapchain hooks and the GPU resources the overlay draws with.
//!
//! Everything the overlay needs on a swapchain (render pass, pipeline,
//! atlas texture, per-frame draw records) is created at
//! `vkCreateSwapchainKHR` and torn down in reverse dependency order at
//! destroy. If setup fails the swapchain is still registered as a
//! passthrough and presents run untouched.

use std::ffi::c_void;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;
use parking_lot::Mutex;
use tracing::{debug, warn};

use glimpse_core::draw::{DrawData, PlotRenderer};
use glimpse_core::draw_pool::DrawPool;
use glimpse_core::stats::FrameTimingTracker;
use glimpse_core::CoreError;

use crate::device::DeviceState;
use crate::runtime::Runtime;
use crate::shaders;

/// Present modes selected by the `vsync` config value, in order.
const VSYNC_MODES: [vk::PresentModeKHR; 4] = [
    vk::PresentModeKHR::FIFO_RELAXED,
    vk::PresentModeKHR::IMMEDIATE,
    vk::PresentModeKHR::MAILBOX,
    vk::PresentModeKHR::FIFO,
];

fn vk_call<T>(call: &'static str, r: Result<T, vk::Result>) -> Result<T, CoreError> {
    r.map_err(|e| CoreError::DriverCall {
        call,
        code: e.as_raw(),
    })
}

/// Frame-timing state of one swapchain, behind a single coarse lock.
pub struct FrameState {
    pub tracker: FrameTimingTracker,
    pub renderer: PlotRenderer,
    pub draw_data: DrawData,
}

#[derive(Default, Clone, Copy)]
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize,
}

/// Everything one overlay submission owns. Recycled through a
/// [`DrawPool`] keyed on fence status.
pub struct DrawRecord {
    pub command_buffer: vk::CommandBuffer,
    pub fence: vk::Fence,
    pub semaphore: vk::Semaphore,
    /// Signaled on the present queue, waited on by the graphics queue when
    /// the two differ.
    pub handoff_semaphore: vk::Semaphore,
    pub vertex: GpuBuffer,
    pub index: GpuBuffer,
}

pub struct OverlaySetup {
    pub render_pass: vk::RenderPass,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub framebuffers: Vec<vk::Framebuffer>,
    pub descriptor_layout: vk::DescriptorSetLayout,
    pub descriptor_pool: vk::DescriptorPool,
    pub descriptor_set: vk::DescriptorSet,
    pub pipeline_layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
    pub sampler: vk::Sampler,
    pub atlas_image: vk::Image,
    pub atlas_memory: vk::DeviceMemory,
    pub atlas_view: vk::ImageView,
    /// Staging buffer for the atlas pixels; the copy is recorded into the
    /// first frame's command buffer.
    pub atlas_staging: GpuBuffer,
    pub atlas_uploaded: AtomicBool,
    pub command_pool: vk::CommandPool,
    pub records: Mutex<DrawPool<DrawRecord>>,
}

pub struct SwapchainState {
    pub swapchain: vk::SwapchainKHR,
    pub device: Arc<DeviceState>,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub overlay: Option<OverlaySetup>,
    pub frame: Mutex<FrameState>,
}

#[no_mangle]
pub unsafe extern "C" fn vkCreateSwapchainKHR(
    device: vk::Device,
    p_create_info: *const vk::SwapchainCreateInfoKHR<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_swapchain: *mut vk::SwapchainKHR,
) -> vk::Result {
    if p_create_info.is_null() || p_swapchain.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    let rt = Runtime::get();
    let Some(dev) = rt.devices.lookup(device.as_raw()) else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };

    let mut ci = unsafe { *p_create_info };
    let vsync = rt.params().vsync as usize;
    if rt.enabled && vsync < VSYNC_MODES.len() {
        ci.present_mode = VSYNC_MODES[vsync];
        debug!(mode = ?ci.present_mode, "present mode overridden");
    }

    let result = unsafe {
        (dev.dispatch.swapchain.fp().create_swapchain_khr)(device, &ci, p_allocator, p_swapchain)
    };
    if result != vk::Result::SUCCESS {
        return result;
    }
    let swapchain = unsafe { *p_swapchain };

    let overlay = if rt.enabled {
        match unsafe { setup_overlay(&dev, swapchain, &ci) } {
            Ok(setup) => Some(setup),
            Err(e) => {
                warn!("overlay setup failed, presenting untouched: {e}");
                None
            }
        }
    } else {
        None
    };

    rt.swapchains.register(
        swapchain.as_raw(),
        Arc::new(SwapchainState {
            swapchain,
            device: dev,
            extent: ci.image_extent,
            format: ci.image_format,
            overlay,
            frame: Mutex::new(FrameState {
                tracker: FrameTimingTracker::new(),
                renderer: PlotRenderer,
                draw_data: DrawData::default(),
            }),
        }),
    );

    vk::Result::SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn vkDestroySwapchainKHR(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    let rt = Runtime::get();
    let state = rt.swapchains.unregister(swapchain.as_raw());
    if let Some(state) = &state {
        if let Some(setup) = &state.overlay {
            unsafe { teardown_overlay(&state.device, setup) };
        }
        debug!("swapchain destroyed");
        unsafe {
            (state.device.dispatch.swapchain.fp().destroy_swapchain_khr)(
                device,
                swapchain,
                p_allocator,
            )
        };
        return;
    }
    // Unknown swapchain: fall through if we can still find the device.
    if let Some(dev) = rt.devices.lookup(device.as_raw()) {
        unsafe { (dev.dispatch.swapchain.fp().destroy_swapchain_khr)(device, swapchain, p_allocator) };
    }
}

// ── Setup ───────────────────────────────────────────────────

/// Create the overlay's GPU resources, releasing whatever was already
/// built when a later step fails.
unsafe fn setup_overlay(
    dev: &DeviceState,
    swapchain: vk::SwapchainKHR,
    ci: &vk::SwapchainCreateInfoKHR<'_>,
) -> Result<OverlaySetup, CoreError> {
    let mut setup = OverlaySetup {
        render_pass: vk::RenderPass::null(),
        images: Vec::new(),
        image_views: Vec::new(),
        framebuffers: Vec::new(),
        descriptor_layout: vk::DescriptorSetLayout::null(),
        descriptor_pool: vk::DescriptorPool::null(),
        descriptor_set: vk::DescriptorSet::null(),
        pipeline_layout: vk::PipelineLayout::null(),
        pipeline: vk::Pipeline::null(),
        sampler: vk::Sampler::null(),
        atlas_image: vk::Image::null(),
        atlas_memory: vk::DeviceMemory::null(),
        atlas_view: vk::ImageView::null(),
        atlas_staging: GpuBuffer::default(),
        atlas_uploaded: AtomicBool::new(false),
        command_pool: vk::CommandPool::null(),
        records: Mutex::new(DrawPool::new()),
    };
    match unsafe { build_overlay(dev, swapchain, ci, &mut setup) } {
        Ok(()) => Ok(setup),
        Err(e) => {
            // Destroying null handles is a no-op, so the partial state
            // tears down the same way a complete one does.
            unsafe { teardown_overlay(dev, &setup) };
            Err(e)
        }
    }
}

unsafe fn build_overlay(
    dev: &DeviceState,
    swapchain: vk::SwapchainKHR,
    ci: &vk::SwapchainCreateInfoKHR<'_>,
    setup: &mut OverlaySetup,
) -> Result<(), CoreError> {
    if dev.graphics.is_none() {
        return Err(CoreError::SwapchainSetup(
            "device has no graphics queue".to_owned(),
        ));
    }
    let d = &dev.dispatch.table;

    setup.images = vk_call("vkGetSwapchainImagesKHR", unsafe {
        dev.dispatch.swapchain.get_swapchain_images(swapchain)
    })?;

    // Render pass: draw over the application's output, then hand the image
    // back in present layout.
    let attachment = vk::AttachmentDescription::default()
        .format(ci.image_format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::LOAD)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);
    let color_ref = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    let color_refs = [color_ref];
    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
    let attachments = [attachment];
    let subpasses = [subpass];
    let dependencies = [dependency];
    let render_pass_ci = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);
    setup.render_pass = vk_call("vkCreateRenderPass", unsafe {
        d.create_render_pass(&render_pass_ci, None)
    })?;

    for image in &setup.images {
        let view_ci = vk::ImageViewCreateInfo::default()
            .image(*image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(ci.image_format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .level_count(1)
                    .layer_count(1),
            );
        let view = vk_call("vkCreateImageView", unsafe {
            d.create_image_view(&view_ci, None)
        })?;
        setup.image_views.push(view);
    }

    for view in &setup.image_views {
        let views = [*view];
        let fb_ci = vk::FramebufferCreateInfo::default()
            .render_pass(setup.render_pass)
            .attachments(&views)
            .width(ci.image_extent.width)
            .height(ci.image_extent.height)
            .layers(1);
        let fb = vk_call("vkCreateFramebuffer", unsafe {
            d.create_framebuffer(&fb_ci, None)
        })?;
        setup.framebuffers.push(fb);
    }

    let sampler_ci = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT);
    setup.sampler = vk_call("vkCreateSampler", unsafe {
        d.create_sampler(&sampler_ci, None)
    })?;

    let samplers = [setup.sampler];
    let binding = vk::DescriptorSetLayoutBinding::default()
        .binding(0)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::FRAGMENT)
        .immutable_samplers(&samplers);
    let bindings = [binding];
    let layout_ci = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    setup.descriptor_layout = vk_call("vkCreateDescriptorSetLayout", unsafe {
        d.create_descriptor_set_layout(&layout_ci, None)
    })?;

    let pool_size = vk::DescriptorPoolSize::default()
        .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .descriptor_count(1);
    let pool_sizes = [pool_size];
    let pool_ci = vk::DescriptorPoolCreateInfo::default()
        .max_sets(1)
        .pool_sizes(&pool_sizes);
    setup.descriptor_pool = vk_call("vkCreateDescriptorPool", unsafe {
        d.create_descriptor_pool(&pool_ci, None)
    })?;

    let set_layouts = [setup.descriptor_layout];
    let alloc_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(setup.descriptor_pool)
        .set_layouts(&set_layouts);
    setup.descriptor_set = vk_call("vkAllocateDescriptorSets", unsafe {
        d.allocate_descriptor_sets(&alloc_info)
    })?[0];

    // Push constants: vec2 scale + vec2 translate in the vertex stage.
    let push_range = vk::PushConstantRange::default()
        .stage_flags(vk::ShaderStageFlags::VERTEX)
        .size(16);
    let push_ranges = [push_range];
    let pl_ci = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(&set_layouts)
        .push_constant_ranges(&push_ranges);
    setup.pipeline_layout = vk_call("vkCreatePipelineLayout", unsafe {
        d.create_pipeline_layout(&pl_ci, None)
    })?;

    setup.pipeline = unsafe { create_pipeline(dev, setup.render_pass, setup.pipeline_layout) }?;

    unsafe { create_atlas(dev, setup) }?;

    let image_info = vk::DescriptorImageInfo::default()
        .sampler(setup.sampler)
        .image_view(setup.atlas_view)
        .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    let image_infos = [image_info];
    let write = vk::WriteDescriptorSet::default()
        .dst_set(setup.descriptor_set)
        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        .image_info(&image_infos);
    unsafe { d.update_descriptor_sets(&[write], &[]) };

    let graphics = dev.graphics.as_ref().map(|g| g.family_index).unwrap_or(0);
    let pool_ci = vk::CommandPoolCreateInfo::default()
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
        .queue_family_index(graphics);
    setup.command_pool = vk_call("vkCreateCommandPool", unsafe {
        d.create_command_pool(&pool_ci, None)
    })?;

    debug!(images = setup.images.len(), "overlay resources created");
    Ok(())
}

unsafe fn create_pipeline(
    dev: &DeviceState,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
) -> Result<vk::Pipeline, CoreError> {
    let d = &dev.dispatch.table;

    let vert_ci = vk::ShaderModuleCreateInfo::default().code(shaders::OVERLAY_VERT_SPV);
    let vert = vk_call("vkCreateShaderModule", unsafe {
        d.create_shader_module(&vert_ci, None)
    })?;
    let frag_ci = vk::ShaderModuleCreateInfo::default().code(shaders::OVERLAY_FRAG_SPV);
    let frag = match vk_call("vkCreateShaderModule", unsafe {
        d.create_shader_module(&frag_ci, None)
    }) {
        Ok(m) => m,
        Err(e) => {
            unsafe { d.destroy_shader_module(vert, None) };
            return Err(e);
        }
    };

    let stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vert)
            .name(c"main"),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(frag)
            .name(c"main"),
    ];

    let binding = vk::VertexInputBindingDescription::default()
        .binding(0)
        .stride(std::mem::size_of::<glimpse_core::draw::DrawVert>() as u32)
        .input_rate(vk::VertexInputRate::VERTEX);
    let bindings = [binding];
    let attributes = [
        vk::VertexInputAttributeDescription::default()
            .location(0)
            .format(vk::Format::R32G32_SFLOAT)
            .offset(0),
        vk::VertexInputAttributeDescription::default()
            .location(1)
            .format(vk::Format::R32G32_SFLOAT)
            .offset(8),
        vk::VertexInputAttributeDescription::default()
            .location(2)
            .format(vk::Format::R8G8B8A8_UNORM)
            .offset(16),
    ];
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&bindings)
        .vertex_attribute_descriptions(&attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST);
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);
    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .line_width(1.0);
    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    // Standard premultiplied-free alpha blend over the frame.
    let blend_attachment = vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(true)
        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .color_blend_op(vk::BlendOp::ADD)
        .src_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
        .alpha_blend_op(vk::BlendOp::ADD)
        .color_write_mask(vk::ColorComponentFlags::RGBA);
    let blend_attachments = [blend_attachment];
    let color_blend =
        vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let pipeline_ci = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .color_blend_state(&color_blend)
        .dynamic_state(&dynamic)
        .layout(layout)
        .render_pass(render_pass);

    let result = unsafe {
        d.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_ci], None)
    };
    unsafe {
        d.destroy_shader_module(vert, None);
        d.destroy_shader_module(frag, None);
    }
    match result {
        Ok(pipelines) => Ok(pipelines[0]),
        Err((_, e)) => Err(CoreError::DriverCall {
            call: "vkCreateGraphicsPipelines",
            code: e.as_raw(),
        }),
    }
}

/// A 1x1 white texel. Quads that want no texture sample this and modulate
/// by vertex color alone. Writes into `setup` as it goes so a failure
/// leaves the partial handles where teardown finds them.
unsafe fn create_atlas(dev: &DeviceState, setup: &mut OverlaySetup) -> Result<(), CoreError> {
    let d = &dev.dispatch.table;

    let image_ci = vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(vk::Format::R8G8B8A8_UNORM)
        .extent(vk::Extent3D {
            width: 1,
            height: 1,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
        .initial_layout(vk::ImageLayout::UNDEFINED);
    setup.atlas_image = vk_call("vkCreateImage", unsafe { d.create_image(&image_ci, None) })?;

    let reqs = unsafe { d.get_image_memory_requirements(setup.atlas_image) };
    let type_index = find_memory_type(
        &dev.memory_props,
        reqs.memory_type_bits,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;
    let alloc = vk::MemoryAllocateInfo::default()
        .allocation_size(reqs.size)
        .memory_type_index(type_index);
    setup.atlas_memory = vk_call("vkAllocateMemory", unsafe { d.allocate_memory(&alloc, None) })?;
    vk_call("vkBindImageMemory", unsafe {
        d.bind_image_memory(setup.atlas_image, setup.atlas_memory, 0)
    })?;

    let view_ci = vk::ImageViewCreateInfo::default()
        .image(setup.atlas_image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(vk::Format::R8G8B8A8_UNORM)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .level_count(1)
                .layer_count(1),
        );
    setup.atlas_view = vk_call("vkCreateImageView", unsafe {
        d.create_image_view(&view_ci, None)
    })?;

    setup.atlas_staging = unsafe {
        create_buffer(dev, 4, vk::BufferUsageFlags::TRANSFER_SRC)
    }?;
    unsafe {
        let ptr = vk_call(
            "vkMapMemory",
            d.map_memory(setup.atlas_staging.memory, 0, 4, vk::MemoryMapFlags::empty()),
        )?;
        std::ptr::write_bytes(ptr as *mut u8, 0xff, 4);
        d.unmap_memory(setup.atlas_staging.memory);
    }

    Ok(())
}

pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Result<u32, CoreError> {
    for i in 0..props.memory_type_count {
        if type_bits & (1 << i) != 0
            && props.memory_types[i as usize].property_flags.contains(flags)
        {
            return Ok(i);
        }
    }
    Err(CoreError::SwapchainSetup(format!(
        "no memory type with {flags:?}"
    )))
}

/// Host-visible, host-coherent buffer.
pub unsafe fn create_buffer(
    dev: &DeviceState,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
) -> Result<GpuBuffer, CoreError> {
    let d = &dev.dispatch.table;
    let buffer_ci = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let buffer = vk_call("vkCreateBuffer", unsafe { d.create_buffer(&buffer_ci, None) })?;
    let reqs = unsafe { d.get_buffer_memory_requirements(buffer) };
    let type_index = match find_memory_type(
        &dev.memory_props,
        reqs.memory_type_bits,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    ) {
        Ok(i) => i,
        Err(e) => {
            unsafe { d.destroy_buffer(buffer, None) };
            return Err(e);
        }
    };
    let alloc = vk::MemoryAllocateInfo::default()
        .allocation_size(reqs.size)
        .memory_type_index(type_index);
    let memory = match vk_call("vkAllocateMemory", unsafe { d.allocate_memory(&alloc, None) }) {
        Ok(m) => m,
        Err(e) => {
            unsafe { d.destroy_buffer(buffer, None) };
            return Err(e);
        }
    };
    vk_call("vkBindBufferMemory", unsafe {
        d.bind_buffer_memory(buffer, memory, 0)
    })?;
    Ok(GpuBuffer {
        buffer,
        memory,
        size: reqs.size,
    })
}

/// Grow `buf` to at least `needed` bytes, freeing the old allocation. The
/// caller guarantees the GPU is done with it (fence checked at acquire).
pub unsafe fn ensure_buffer_capacity(
    dev: &DeviceState,
    buf: &mut GpuBuffer,
    needed: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
) -> Result<(), CoreError> {
    if buf.size >= needed && buf.buffer != vk::Buffer::null() {
        return Ok(());
    }
    unsafe { destroy_buffer(dev, buf) };
    *buf = unsafe { create_buffer(dev, needed.next_power_of_two(), usage) }?;
    Ok(())
}

unsafe fn destroy_buffer(dev: &DeviceState, buf: &GpuBuffer) {
    let d = &dev.dispatch.table;
    if buf.buffer != vk::Buffer::null() {
        unsafe { d.destroy_buffer(buf.buffer, None) };
    }
    if buf.memory != vk::DeviceMemory::null() {
        unsafe { d.free_memory(buf.memory, None) };
    }
}

impl OverlaySetup {
    /// Build a fresh draw record. Fence starts signaled so a brand-new
    /// record and a recycled one reset it the same way.
    pub unsafe fn create_record(&self, dev: &DeviceState) -> Result<DrawRecord, CoreError> {
        let d = &dev.dispatch.table;

        let alloc = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer =
            vk_call("vkAllocateCommandBuffers", unsafe { d.allocate_command_buffers(&alloc) })?[0];
        // The loader has to stamp its dispatch pointer into objects the
        // layer creates behind the application's back.
        if let Some(set_loader_data) = dev.set_loader_data {
            let _ = unsafe {
                set_loader_data(dev.handle, command_buffer.as_raw() as *mut c_void)
            };
        }

        let fence_ci = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let fence = vk_call("vkCreateFence", unsafe { d.create_fence(&fence_ci, None) })?;
        let sem_ci = vk::SemaphoreCreateInfo::default();
        let semaphore = vk_call("vkCreateSemaphore", unsafe { d.create_semaphore(&sem_ci, None) })?;
        let handoff_semaphore =
            vk_call("vkCreateSemaphore", unsafe { d.create_semaphore(&sem_ci, None) })?;

        Ok(DrawRecord {
            command_buffer,
            fence,
            semaphore,
            handoff_semaphore,
            vertex: GpuBuffer::default(),
            index: GpuBuffer::default(),
        })
    }
}

// ── Teardown ────────────────────────────────────────────────

unsafe fn teardown_overlay(dev: &DeviceState, setup: &OverlaySetup) {
    let d = &dev.dispatch.table;

    // Draw records may still be in flight; fences gate the rest.
    let mut records = setup.records.lock();
    for record in records.drain() {
        unsafe {
            let _ = d.wait_for_fences(&[record.fence], true, u64::MAX);
            d.destroy_fence(record.fence, None);
            d.destroy_semaphore(record.semaphore, None);
            d.destroy_semaphore(record.handoff_semaphore, None);
            d.free_command_buffers(setup.command_pool, &[record.command_buffer]);
            destroy_buffer(dev, &record.vertex);
            destroy_buffer(dev, &record.index);
        }
    }
    drop(records);

    unsafe {
        d.destroy_command_pool(setup.command_pool, None);
        d.destroy_pipeline(setup.pipeline, None);
        d.destroy_pipeline_layout(setup.pipeline_layout, None);
        d.destroy_descriptor_pool(setup.descriptor_pool, None);
        d.destroy_descriptor_set_layout(setup.descriptor_layout, None);
        destroy_buffer(dev, &setup.atlas_staging);
        d.destroy_image_view(setup.atlas_view, None);
        d.destroy_image(setup.atlas_image, None);
        d.free_memory(setup.atlas_memory, None);
        d.destroy_sampler(setup.sampler, None);
        for fb in &setup.framebuffers {
            d.destroy_framebuffer(*fb, None);
        }
        for view in &setup.image_views {
            d.destroy_image_view(*view, None);
        }
        d.destroy_render_pass(setup.render_pass, None);
    }
}
