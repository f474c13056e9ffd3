//! Records how this binary was built for `schemagate version --extended`
//! and `schemagate doctor`.

const REPORTED_FEATURES: [&str; 3] = ["async", "watch", "cli"];

fn main() {
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let features: Vec<&str> = REPORTED_FEATURES
        .into_iter()
        .filter(|feature| {
            let var = format!("CARGO_FEATURE_{}", feature.to_ascii_uppercase());
            std::env::var_os(var).is_some()
        })
        .collect();

    println!("cargo:rustc-env=SCHEMAGATE_BUILD_TARGET={target}");
    println!("cargo:rustc-env=SCHEMAGATE_BUILD_PROFILE={profile}");
    println!(
        "cargo:rustc-env=SCHEMAGATE_BUILD_FEATURES={}",
        features.join(",")
    );
    println!("cargo:rerun-if-env-changed=TARGET");
    println!("cargo:rerun-if-env-changed=PROFILE");
}
