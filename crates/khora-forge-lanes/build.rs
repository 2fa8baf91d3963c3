// intel_tex_2 ships C++ objects (ISPC kernels) but does not link the C++
// runtime itself; link libstdc++ so downstream binaries and tests resolve
// symbols like __gxx_personality_v0.
fn main() {
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.contains("linux") {
        println!("cargo:rustc-link-lib=dylib=stdc++");
    }
}
