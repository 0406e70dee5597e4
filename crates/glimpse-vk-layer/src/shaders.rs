//! Pre-assembled SPIR-V for the overlay pipeline. The GLSL sources live in
//! `shaders/`; the binaries are checked in so the build needs no shader
//! toolchain.

/// `shaders/overlay.vert`: scale/translate push constants, passthrough
/// color and uv.
pub const OVERLAY_VERT_SPV: &[u32] = &[
    // header
    0x0723_0203, 0x0001_0000, 0x0008_000a, 40, 0,
    // OpCapability Shader
    0x0002_0011, 1,
    // OpExtInstImport %1 "GLSL.std.450"
    0x0006_000b, 1, 0x4c53_4c47, 0x6474_732e, 0x3035_342e, 0x0000_0000,
    // OpMemoryModel Logical GLSL450
    0x0003_000e, 0, 1,
    // OpEntryPoint Vertex %4 "main" %9 %10 %12 %14 %16 %17
    0x000b_000f, 0, 4, 0x6e69_616d, 0, 9, 10, 12, 14, 16, 17,
    // decorations
    0x0004_0047, 9, 30, 0,   // in_pos Location 0
    0x0004_0047, 10, 30, 1,  // in_uv Location 1
    0x0004_0047, 12, 30, 2,  // in_col Location 2
    0x0004_0047, 14, 30, 0,  // out_col Location 0
    0x0004_0047, 16, 30, 1,  // out_uv Location 1
    0x0004_0047, 17, 11, 0,  // gl_Position BuiltIn Position
    0x0005_0048, 18, 0, 35, 0, // PushConstants member 0 Offset 0
    0x0005_0048, 18, 1, 35, 8, // PushConstants member 1 Offset 8
    0x0003_0047, 18, 2,      // PushConstants Block
    // types, variables, constants
    0x0002_0013, 2,          // %2 void
    0x0003_0021, 3, 2,       // %3 fn() -> void
    0x0003_0016, 5, 32,      // %5 f32
    0x0004_0017, 6, 5, 2,    // %6 vec2
    0x0004_0017, 7, 5, 4,    // %7 vec4
    0x0004_0020, 8, 1, 6,    // %8 ptr Input vec2
    0x0004_003b, 8, 9, 1,    // %9 in_pos
    0x0004_003b, 8, 10, 1,   // %10 in_uv
    0x0004_0020, 11, 1, 7,   // %11 ptr Input vec4
    0x0004_003b, 11, 12, 1,  // %12 in_col
    0x0004_0020, 13, 3, 7,   // %13 ptr Output vec4
    0x0004_003b, 13, 14, 3,  // %14 out_col
    0x0004_0020, 15, 3, 6,   // %15 ptr Output vec2
    0x0004_003b, 15, 16, 3,  // %16 out_uv
    0x0004_003b, 13, 17, 3,  // %17 gl_Position
    0x0004_001e, 18, 6, 6,   // %18 struct { vec2, vec2 }
    0x0004_0020, 19, 9, 18,  // %19 ptr PushConstant
    0x0004_003b, 19, 20, 9,  // %20 pc
    0x0004_0015, 21, 32, 1,  // %21 i32
    0x0004_002b, 21, 22, 0,  // %22 = 0
    0x0004_002b, 21, 23, 1,  // %23 = 1
    0x0004_0020, 24, 9, 6,   // %24 ptr PushConstant vec2
    0x0004_002b, 5, 25, 0x0000_0000, // %25 = 0.0
    0x0004_002b, 5, 26, 0x3f80_0000, // %26 = 1.0
    // main
    0x0005_0036, 2, 4, 0, 3,
    0x0002_00f8, 27,
    0x0004_003d, 7, 28, 12,  // load in_col
    0x0003_003e, 14, 28,     // out_col = in_col
    0x0004_003d, 6, 29, 10,  // load in_uv
    0x0003_003e, 16, 29,     // out_uv = in_uv
    0x0004_003d, 6, 30, 9,   // load in_pos
    0x0005_0041, 24, 31, 20, 22,
    0x0004_003d, 6, 32, 31,  // load pc.scale
    0x0005_0085, 6, 33, 30, 32,
    0x0005_0041, 24, 34, 20, 23,
    0x0004_003d, 6, 35, 34,  // load pc.translate
    0x0005_0081, 6, 36, 33, 35,
    0x0005_0051, 5, 37, 36, 0,
    0x0005_0051, 5, 38, 36, 1,
    0x0007_0050, 7, 39, 37, 38, 25, 26,
    0x0003_003e, 17, 39,     // gl_Position
    0x0001_00fd,
    0x0001_0038,
];

/// `shaders/overlay.frag`: vertex color modulated by the atlas texture.
pub const OVERLAY_FRAG_SPV: &[u32] = &[
    // header
    0x0723_0203, 0x0001_0000, 0x0008_000a, 24, 0,
    // OpCapability Shader
    0x0002_0011, 1,
    // OpExtInstImport %1 "GLSL.std.450"
    0x0006_000b, 1, 0x4c53_4c47, 0x6474_732e, 0x3035_342e, 0x0000_0000,
    // OpMemoryModel Logical GLSL450
    0x0003_000e, 0, 1,
    // OpEntryPoint Fragment %4 "main" %13 %9 %11
    0x0008_000f, 4, 4, 0x6e69_616d, 0, 13, 9, 11,
    // OpExecutionMode %4 OriginUpperLeft
    0x0003_0010, 4, 7,
    // decorations
    0x0004_0047, 9, 30, 0,   // in_col Location 0
    0x0004_0047, 11, 30, 1,  // in_uv Location 1
    0x0004_0047, 13, 30, 0,  // out_col Location 0
    0x0004_0047, 17, 34, 0,  // tex DescriptorSet 0
    0x0004_0047, 17, 33, 0,  // tex Binding 0
    // types and variables
    0x0002_0013, 2,          // %2 void
    0x0003_0021, 3, 2,       // %3 fn() -> void
    0x0003_0016, 5, 32,      // %5 f32
    0x0004_0017, 6, 5, 4,    // %6 vec4
    0x0004_0017, 7, 5, 2,    // %7 vec2
    0x0004_0020, 8, 1, 6,    // %8 ptr Input vec4
    0x0004_003b, 8, 9, 1,    // %9 in_col
    0x0004_0020, 10, 1, 7,   // %10 ptr Input vec2
    0x0004_003b, 10, 11, 1,  // %11 in_uv
    0x0004_0020, 12, 3, 6,   // %12 ptr Output vec4
    0x0004_003b, 12, 13, 3,  // %13 out_col
    0x0009_0019, 14, 5, 1, 0, 0, 0, 1, 0, // %14 image2D
    0x0003_001b, 15, 14,     // %15 sampled image
    0x0004_0020, 16, 0, 15,  // %16 ptr UniformConstant
    0x0004_003b, 16, 17, 0,  // %17 tex
    // main
    0x0005_0036, 2, 4, 0, 3,
    0x0002_00f8, 18,
    0x0004_003d, 6, 19, 9,   // load in_col
    0x0004_003d, 15, 20, 17, // load tex
    0x0004_003d, 7, 21, 11,  // load in_uv
    0x0005_0057, 6, 22, 20, 21, // sample
    0x0005_0085, 6, 23, 19, 22, // modulate
    0x0003_003e, 13, 23,
    0x0001_00fd,
    0x0001_0038,
];
