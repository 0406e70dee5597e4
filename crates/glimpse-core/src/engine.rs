//! Identify what is driving the swapchain: translation layer or native
//! client, plus human-readable device and driver strings for the HUD and
//! the control greeting.

/// Engines reported by translation layers that we surface verbatim.
const KNOWN_ENGINES: [&str; 3] = ["DXVK", "vkd3d", "Feral3D"];

pub const VENDOR_NVIDIA: u32 = 0x10de;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineIdentity {
    pub name: String,
    /// Only translation layers encode a meaningful engine version.
    pub version: Option<String>,
}

/// Classify the application from its `VkApplicationInfo` engine fields.
/// Unrecognized engines collapse to plain `VULKAN`.
pub fn identify_engine(engine_name: Option<&str>, engine_version: u32) -> EngineIdentity {
    match engine_name {
        Some(name) if KNOWN_ENGINES.contains(&name) => {
            let version = if name == "DXVK" || name == "vkd3d" {
                Some(vk_version_string(engine_version))
            } else {
                None
            };
            // vkd3d self-reports lowercase; the HUD shows it capitalized.
            let display = if name == "vkd3d" { "VKD3D" } else { name };
            EngineIdentity {
                name: display.to_owned(),
                version,
            }
        }
        _ => EngineIdentity {
            name: "VULKAN".to_owned(),
            version: None,
        },
    }
}

/// `major.minor.patch` from a `VK_MAKE_VERSION`-packed value.
pub fn vk_version_string(version: u32) -> String {
    format!(
        "{}.{}.{}",
        version >> 22,
        (version >> 12) & 0x3ff,
        version & 0xfff
    )
}

/// Driver versions are vendor-defined; NVIDIA packs 10-bit major and 8-bit
/// minor fields, everyone else sticks to the Vulkan encoding.
pub fn driver_version_string(vendor_id: u32, driver_version: u32) -> String {
    if vendor_id == VENDOR_NVIDIA {
        format!(
            "{}.{:02}",
            (driver_version >> 22) & 0x3ff,
            (driver_version >> 14) & 0xff
        )
    } else {
        vk_version_string(driver_version)
    }
}

/// NUL-terminated fixed array from `VkPhysicalDeviceProperties::device_name`.
pub fn device_name_string(raw: &[std::os::raw::c_char]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
