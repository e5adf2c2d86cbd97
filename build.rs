// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-changed=src/shaders");

    // Packagers may pin the version instead of relying on git
    let version = std::env::var("PYRAMID_DENOISE_VERSION").unwrap_or_else(|_| git_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

fn git_version() -> String {
    // "0.1.0" at a tag, "0.1.0-5-gabcdef1" after it, bare hash without tags
    let described = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string());

    match described {
        Some(version) => version
            .strip_prefix('v')
            .map(str::to_string)
            .unwrap_or(version),
        None => env_fallback(),
    }
}

fn env_fallback() -> String {
    std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".to_string())
}
