/// Any of these carries the key(s) `Config::from_env` reads for the LLM.
const LLM_KEY_VARS: [&str; 4] = ["LLM_API_KEYS", "LLM_API_KEY", "GEMINI_API_KEYS", "GEMINI_API_KEY"];

fn main() {
    // Declare the custom cfg so rustc knows about it
    println!("cargo::rustc-check-cfg=cfg(has_llm_key)");

    for var in LLM_KEY_VARS {
        println!("cargo::rerun-if-env-changed={}", var);
    }

    // Emit a custom cfg flag if any LLM key variable is set
    if LLM_KEY_VARS
        .iter()
        .any(|var| std::env::var(var).is_ok_and(|value| !value.trim().is_empty()))
    {
        println!("cargo:rustc-cfg=has_llm_key");
    }
}
