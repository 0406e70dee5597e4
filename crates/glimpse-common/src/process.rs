//! Process identity and overlay blacklisting.
//!
//! Some launchers and compositors create throwaway Vulkan instances; drawing
//! an overlay into them is at best useless and at worst breaks them. Hooks
//! check `is_blacklisted()` early and degrade to pass-through.

use std::sync::OnceLock;

const DEFAULT_BLACKLIST: &[&str] = &[
    "steam",
    "steamwebhelper",
    "gldriverquery",
    "vulkandriverquery",
    "wine64-preloader",
    "wine-preloader",
];

/// Name of the current process, as the kernel reports it.
pub fn process_name() -> &'static str {
    static NAME: OnceLock<String> = OnceLock::new();
    NAME.get_or_init(|| {
        std::fs::read_to_string("/proc/self/comm")
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    })
}

/// Whether the overlay should stay out of this process entirely.
pub fn is_blacklisted(extra: &[String]) -> bool {
    let name = process_name();
    DEFAULT_BLACKLIST.iter().any(|b| *b == name) || extra.iter().any(|b| b == name)
}
