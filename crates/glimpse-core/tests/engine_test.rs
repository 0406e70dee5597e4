//! Integration test: engine and driver identification
//!
//! Run with: cargo test --test engine_test -- --nocapture

use glimpse_core::engine::{
    device_name_string, driver_version_string, identify_engine, vk_version_string, VENDOR_NVIDIA,
};

fn pack_vk(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 22) | (minor << 12) | patch
}

#[test]
fn test_translation_layers_are_recognized() {
    let id = identify_engine(Some("DXVK"), pack_vk(2, 3, 0));
    if id.name != "DXVK" {
        panic!("expected DXVK, got {:?}", id);
    }
    match id.version.as_deref() {
        Some("2.3.0") => {}
        other => panic!("expected version 2.3.0, got {:?}", other),
    }

    // vkd3d identifies itself lowercase but displays capitalized.
    let id = identify_engine(Some("vkd3d"), pack_vk(1, 10, 2));
    if id.name != "VKD3D" || id.version.as_deref() != Some("1.10.2") {
        panic!("expected VKD3D 1.10.2, got {:?}", id);
    }
}

#[test]
fn test_feral_has_no_version() {
    let id = identify_engine(Some("Feral3D"), pack_vk(9, 9, 9));
    if id.name != "Feral3D" {
        panic!("expected Feral3D, got {:?}", id);
    }
    if id.version.is_some() {
        panic!("expected no version for Feral3D, got {:?}", id.version);
    }
}

#[test]
fn test_unrecognized_engines_collapse_to_vulkan() {
    for name in [Some("UnityPlayer"), Some("id Tech"), None] {
        let id = identify_engine(name, 12345);
        if id.name != "VULKAN" || id.version.is_some() {
            panic!("expected plain VULKAN for {:?}, got {:?}", name, id);
        }
    }
}

#[test]
fn test_vk_version_string() {
    let s = vk_version_string(pack_vk(1, 3, 280));
    if s != "1.3.280" {
        panic!("expected 1.3.280, got {:?}", s);
    }
}

#[test]
fn test_nvidia_driver_version_packing() {
    // 550.54 in NVIDIA packing: 10-bit major at 22, 8-bit minor at 14.
    let packed = (550 << 22) | (54 << 14);
    let s = driver_version_string(VENDOR_NVIDIA, packed);
    if s != "550.54" {
        panic!("expected 550.54, got {:?}", s);
    }
    // The minor field is zero-padded.
    let packed = (535 << 22) | (5 << 14);
    let s = driver_version_string(VENDOR_NVIDIA, packed);
    if s != "535.05" {
        panic!("expected 535.05, got {:?}", s);
    }
}

#[test]
fn test_other_vendors_use_vulkan_packing() {
    const VENDOR_AMD: u32 = 0x1002;
    let s = driver_version_string(VENDOR_AMD, pack_vk(2, 0, 283));
    if s != "2.0.283" {
        panic!("expected 2.0.283, got {:?}", s);
    }
}

#[test]
fn test_device_name_from_fixed_array() {
    let mut raw = [0 as std::os::raw::c_char; 16];
    for (i, b) in b"Radeon RX".iter().enumerate() {
        raw[i] = *b as std::os::raw::c_char;
    }
    let s = device_name_string(&raw);
    if s != "Radeon RX" {
        panic!("expected Radeon RX, got {:?}", s);
    }

    let empty = [0 as std::os::raw::c_char; 4];
    if !device_name_string(&empty).is_empty() {
        panic!("expected an empty name");
    }
}
