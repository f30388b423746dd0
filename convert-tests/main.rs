#![warn(
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_qualifications
)]
#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod defs;

fn main() -> ExitCode {
    let root_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .canonicalize()
        .unwrap();
    let tests_path = Path::new("convert-tests").join("tests");

    let tests_paths = gather_tests(&root_path, &tests_path);

    let args = libtest_mimic::Arguments::from_args();

    // The converter drives the git command line client.
    let have_git = std::process::Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success());
    if !have_git {
        eprintln!("git not found, conversion tests will be ignored");
    }

    let tests = tests_paths
        .into_iter()
        .map(|test_path| {
            let full_test_path = root_path.join(&test_path);
            let name = test_path
                .strip_prefix(&tests_path)
                .unwrap_or(&test_path)
                .with_extension("");
            libtest_mimic::Trial::test(name.to_string_lossy(), move || {
                test::run_test(&full_test_path).map_err(|e| e.into())
            })
            .with_ignored_flag(!have_git)
        })
        .collect();

    let conclusion = libtest_mimic::run(&args, tests);
    if conclusion.has_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn gather_tests(root_path: &Path, tests_path: &Path) -> BTreeSet<PathBuf> {
    let mut tests = BTreeSet::new();

    let mut dir_queue = vec![tests_path.to_path_buf()];
    while let Some(current_sub_dir) = dir_queue.pop() {
        let current_dir = root_path.join(&current_sub_dir);
        for entry in current_dir.read_dir().unwrap() {
            let entry = entry.unwrap();
            let entry_name = entry.file_name();

            if entry.file_type().unwrap().is_dir() {
                dir_queue.push(current_sub_dir.join(entry_name));
            } else if Path::new(&entry_name).extension() == Some(OsStr::new("yaml")) {
                tests.insert(current_sub_dir.join(entry_name));
            }
        }
    }

    tests
}
