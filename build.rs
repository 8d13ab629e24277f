// Compile the C variadic shim into a static library linked into the crate.
fn main() {
    println!("cargo::rerun-if-changed=csrc/progress_shim.c");
    println!("cargo::rerun-if-changed=include/ocshim.h");
    cc::Build::new()
        .file("csrc/progress_shim.c")
        .include("include")
        .warnings(true)
        .compile("ocshim_progress");
}
