use design_prompt::{
    bundle::{Platform, find_executable, stage_runtime},
    config::Bundle,
};
use std::path::Path;
use tempfile::TempDir;

fn bundle_cfg(root: &Path) -> Bundle {
    Bundle {
        executable_stem: "python_server".into(),
        source_dirs: vec![
            root.join("dist").display().to_string(),
            root.join("build").display().to_string(),
        ],
        release_dir: root.join("release").display().to_string(),
    }
}

fn mkdirs(p: &Path) {
    std::fs::create_dir_all(p).expect("mkdir");
}

#[test]
fn copies_into_every_unpacked_linux_app() {
    let root = TempDir::new().expect("tempdir");
    mkdirs(&root.path().join("build"));
    std::fs::write(root.path().join("build/python_server"), b"#!/bin/sh\n").expect("write exe");
    for d in ["linux-unpacked", "linux-arm64-unpacked"] {
        mkdirs(&root.path().join("release").join(d).join("resources/app"));
    }
    mkdirs(&root.path().join("release/win-unpacked/resources/app"));

    let report = stage_runtime(&bundle_cfg(root.path()), Platform::Linux).expect("stage");
    assert_eq!(report.copied.len(), 2);
    assert!(report.source.ends_with("build/python_server"));
    for dest in &report.copied {
        assert_eq!(std::fs::read(dest).expect("read copy"), b"#!/bin/sh\n");
    }
    assert!(!root
        .path()
        .join("release/win-unpacked/resources/app/python_server")
        .exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&report.copied[0])
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn first_source_dir_wins() {
    let root = TempDir::new().expect("tempdir");
    for d in ["dist", "build"] {
        mkdirs(&root.path().join(d));
        std::fs::write(root.path().join(d).join("python_server"), d).expect("write exe");
    }
    let found = find_executable(&bundle_cfg(root.path()), Platform::Linux).expect("found");
    assert!(found.starts_with(root.path().join("dist")));
}

#[test]
fn windows_uses_exe_suffix() {
    let root = TempDir::new().expect("tempdir");
    mkdirs(&root.path().join("dist"));
    std::fs::write(root.path().join("dist/python_server.exe"), b"MZ").expect("write exe");
    mkdirs(&root.path().join("release/win-x64-unpacked/resources/app"));

    let report = stage_runtime(&bundle_cfg(root.path()), Platform::Windows).expect("stage");
    assert_eq!(report.copied.len(), 1);
    assert!(report.copied[0].ends_with("resources/app/python_server.exe"));
}

#[test]
fn mac_app_bundles_are_discovered() {
    let root = TempDir::new().expect("tempdir");
    mkdirs(&root.path().join("dist"));
    std::fs::write(root.path().join("dist/python_server"), b"bin").expect("write exe");
    mkdirs(
        &root
            .path()
            .join("release/mac-arm64/Design Prompt.app/Contents/Resources/app"),
    );
    mkdirs(&root.path().join("release/mac-arm64/notes"));

    let report = stage_runtime(&bundle_cfg(root.path()), Platform::Macos).expect("stage");
    assert_eq!(report.copied.len(), 1);
    assert!(report.copied[0]
        .to_string_lossy()
        .contains("Design Prompt.app/Contents/Resources/app"));
}

#[test]
fn missing_executable_is_an_error() {
    let root = TempDir::new().expect("tempdir");
    let err = stage_runtime(&bundle_cfg(root.path()), Platform::Linux).expect_err("missing");
    assert!(err.to_string().contains("python_server not found"));
}

#[test]
fn no_app_dirs_copies_nothing() {
    let root = TempDir::new().expect("tempdir");
    mkdirs(&root.path().join("dist"));
    std::fs::write(root.path().join("dist/python_server"), b"bin").expect("write exe");
    let report = stage_runtime(&bundle_cfg(root.path()), Platform::Linux).expect("stage");
    assert!(report.copied.is_empty());
}

#[test]
fn platform_names_parse() {
    assert_eq!("darwin".parse::<Platform>().expect("parse"), Platform::Macos);
    assert_eq!("Windows".parse::<Platform>().expect("parse"), Platform::Windows);
    assert!("beos".parse::<Platform>().is_err());
}
