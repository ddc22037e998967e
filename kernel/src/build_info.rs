// Build Metadata and Versioning
//
// Defines compile-time build information for the kernel: name, version,
// development phase, and human-readable banners. This data is embedded
// directly into the binary and used for diagnostics and boot-time
// reporting.
//
// Design principles:
// - Compile-time constants only (no runtime overhead)
// - Single source of truth for versioning and build identity
// - Macro-based definition to avoid duplication and inconsistencies
//
// Usage notes:
// - `BOOT_BANNER` is intended for early boot output
// - `VERSION_TAG` is suitable for logs, panic messages, and diagnostics
// - Updating the version or phase requires changing only one macro call

macro_rules! define_build_meta {
    ($kernel_name:literal, $version:literal, $phase:literal, $phase_label:literal, $build_date:literal) => {
        #[allow(dead_code)]
        pub const KERNEL_NAME: &str = $kernel_name;
        #[allow(dead_code)]
        pub const VERSION: &str = $version;
        #[allow(dead_code)]
        pub const PHASE: &str = $phase;
        #[allow(dead_code)]
        pub const PHASE_LABEL: &str = $phase_label;
        #[allow(dead_code)]
        pub const BUILD_DATE: &str = $build_date;

        #[allow(dead_code)]
        pub const VERSION_TAG: &str = concat!($kernel_name, " v", $version);
        pub const BOOT_BANNER: &str = concat!(
            $kernel_name,
            " v",
            $version,
            " - Phase ",
            $phase,
            ": ",
            $phase_label
        );
    };
}

define_build_meta!(
    "Ferrite Kernel",
    "0.1.0",
    "1",
    "Trap and Interrupt Core",
    "2026-08-25"
);
