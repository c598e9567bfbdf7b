use std::env;
use std::path::PathBuf;

/// Render the C header into `OUT_DIR/formfetch.h`.
fn main() {
    println!("cargo:rerun-if-changed=src");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };

    let result = cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("FORMFETCH_H")
        .generate();

    match result {
        Ok(bindings) => {
            bindings.write_to_file(PathBuf::from(out_dir).join("formfetch.h"));
        }
        Err(err) => println!("cargo:warning=formfetch.h not generated: {err}"),
    }
}
