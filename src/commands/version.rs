/// Version and build details, read from the vergen output of build.rs
pub struct BuildInfo {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_timestamp: &'static str,
    pub target: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: option_env!("VERGEN_GIT_DESCRIBE").unwrap_or(env!("CARGO_PKG_VERSION")),
            git_commit: option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
            build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
            target: option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown"),
        }
    }
}

pub fn handle_version() {
    let info = BuildInfo::current();
    println!("DWM Version : {}", info.version);
    println!("Git commit  : {}", info.git_commit);
    println!("Built       : {}", info.build_timestamp);
    println!("Target      : {}", info.target);
}
