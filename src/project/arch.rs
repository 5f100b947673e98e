//! CPU architecture names as used by Debian, snap file names and LXD image aliases.

/// CPU architecture in Debian naming.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arch {
    /// x86_64 / AMD64 (64-bit)
    Amd64,
    /// x86 / i686 (32-bit)
    I386,
    /// AArch64 / ARM64 (64-bit)
    Arm64,
    /// ARM with hard-float (32-bit)
    Armhf,
    /// POWER little-endian (64-bit)
    Ppc64el,
    /// IBM Z
    S390x,
    /// RISC-V (64-bit)
    Riscv64,
}

impl Arch {
    /// Architecture of the host this binary runs on, if it has a Debian name.
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Self::Amd64),
            "x86" => Some(Self::I386),
            "aarch64" => Some(Self::Arm64),
            "arm" => Some(Self::Armhf),
            "powerpc64" => Some(Self::Ppc64el),
            "s390x" => Some(Self::S390x),
            "riscv64" => Some(Self::Riscv64),
            _ => None,
        }
    }

    /// Debian name of the architecture
    pub fn deb_name(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::I386 => "i386",
            Self::Arm64 => "arm64",
            Self::Armhf => "armhf",
            Self::Ppc64el => "ppc64el",
            Self::S390x => "s390x",
            Self::Riscv64 => "riscv64",
        }
    }
}

/// Debian name of the host architecture, or the Rust name when there is no mapping.
pub fn host_deb_arch() -> String {
    Arch::host()
        .map(|arch| arch.deb_name().to_string())
        .unwrap_or_else(|| std::env::consts::ARCH.to_string())
}
