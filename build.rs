use std::env;
use std::path::PathBuf;

// ffmpeg-sys-next finds FFmpeg through pkg-config on Unix. On Windows it
// needs FFMPEG_DIR, so point at a vcpkg install when one is present.
fn main() {
    println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
    println!("cargo:rerun-if-env-changed=VCPKG_ROOT");
    println!("cargo:rerun-if-env-changed=VCPKGRS_TRIPLET");

    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows" {
        return;
    }
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=framesnap needs the FFmpeg development libraries; set FFMPEG_DIR to their install prefix."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install = PathBuf::from(vcpkg_root).join("installed").join(triplet);
    if install.join("include").join("libavcodec").is_dir() {
        println!(
            "cargo:warning=Found FFmpeg under {}; set FFMPEG_DIR to that path if ffmpeg-sys-next cannot locate it.",
            install.display()
        );
    } else {
        println!(
            "cargo:warning=No FFmpeg headers under {}; run `vcpkg install ffmpeg` or set FFMPEG_DIR.",
            install.display()
        );
    }
}
