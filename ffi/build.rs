use std::env;
use std::path::PathBuf;

/// Write `session_ffi.h` for C callers into `OUT_DIR`. A failure to generate
/// the header is reported as a warning and never fails the build.
fn main() {
    println!("cargo:rerun-if-changed=src");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };

    match cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("SESSION_FFI_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(PathBuf::from(out_dir).join("session_ffi.h"));
        }
        Err(e) => println!("cargo:warning=could not generate C header: {e}"),
    }
}
