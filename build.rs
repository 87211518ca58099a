//! Build script for rtc-bridge crate.
//!
//! Links against the native WebRTC plugin when the `native` feature is
//! enabled. Without the feature nothing is linked and only the in-process
//! loopback engine is available.

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=RTC_BRIDGE_PLUGIN_DIR");

    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    let plugin_dir = env::var("RTC_BRIDGE_PLUGIN_DIR")
        .map(PathBuf::from)
        .expect("RTC_BRIDGE_PLUGIN_DIR must point at the directory containing the webrtc plugin");

    println!("cargo:rustc-link-search=native={}", plugin_dir.display());
    println!("cargo:rustc-link-lib=dylib=webrtc");

    // On Linux, the plugin needs pthread and dl
    #[cfg(target_os = "linux")]
    {
        println!("cargo:rustc-link-lib=pthread");
        println!("cargo:rustc-link-lib=dl");
    }

    // On macOS, link the frameworks the plugin's media stack uses
    #[cfg(target_os = "macos")]
    {
        println!("cargo:rustc-link-lib=framework=CoreFoundation");
        println!("cargo:rustc-link-lib=framework=CoreMedia");
        println!("cargo:rustc-link-lib=framework=VideoToolbox");
    }
}
