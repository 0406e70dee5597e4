//! Integration test: overlay session configuration reload
//!
//! Run with: cargo test --test session_test -- --nocapture

use glimpse_core::session::OverlaySession;

#[test]
fn test_reload_config_swaps_parameter_set() {
    let path = std::env::temp_dir().join(format!("glimpse-session-{}.toml", std::process::id()));
    let path_str = path.to_string_lossy().into_owned();

    std::fs::write(&path, "fps_limit = 60\nfont_size = 20\n").expect("write config");
    std::env::set_var("GLIMPSE_CONFIG", &path_str);

    let session = OverlaySession::init();
    {
        let params = session.params();
        if params.fps_limit != 60 || params.font_size != 20 {
            panic!(
                "expected the startup config, got fps_limit {} font_size {}",
                params.fps_limit, params.font_size
            );
        }
    }

    // Rewrite the file and reload; dropped keys fall back to defaults.
    std::fs::write(&path, "fps_limit = 120\n").expect("rewrite config");
    session.reload_config();
    {
        let params = session.params();
        if params.fps_limit != 120 {
            panic!("expected the reloaded fps_limit 120, got {}", params.fps_limit);
        }
        if params.font_size != 24 {
            panic!(
                "expected font_size back at its default, got {}",
                params.font_size
            );
        }
    }

    // The pacer picks up the new frame budget.
    if !session.pacer.lock().enabled() {
        panic!("expected the pacer enabled after reloading a capped config");
    }

    let _ = std::fs::remove_file(&path);
}
