use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=MOSQUITTO_LIB_DIR");

    // The native backend is opt-in; the default build carries no link-time
    // requirement so the engine seam and dispatch core test everywhere.
    if env::var_os("CARGO_FEATURE_MOSQUITTO").is_none() {
        return;
    }

    if let Ok(dir) = env::var("MOSQUITTO_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }
    println!("cargo:rustc-link-lib=dylib=mosquitto");
}
