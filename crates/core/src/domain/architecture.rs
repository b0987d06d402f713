// Known CPU architectures and their Mach-O (cputype, cpusubtype) pairs

const CPU_ARCH_ABI64: i32 = 0x0100_0000;
const CPU_ARCH_ABI64_32: i32 = 0x0200_0000;

const CPU_TYPE_X86: i32 = 7;
const CPU_TYPE_X86_64: i32 = CPU_TYPE_X86 | CPU_ARCH_ABI64;
const CPU_TYPE_ARM: i32 = 12;
const CPU_TYPE_ARM64: i32 = CPU_TYPE_ARM | CPU_ARCH_ABI64;
const CPU_TYPE_ARM64_32: i32 = CPU_TYPE_ARM | CPU_ARCH_ABI64_32;
const CPU_TYPE_POWERPC: i32 = 18;
const CPU_TYPE_POWERPC64: i32 = CPU_TYPE_POWERPC | CPU_ARCH_ABI64;

/// Capability bits carried in the high byte of cpusubtype (e.g. LIB64, PTRAUTH ABI)
pub const CPU_SUBTYPE_MASK: i32 = 0xff00_0000_u32 as i32;

/// A named architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Architecture {
    pub name: &'static str,
    pub cpu_type: i32,
    pub cpu_subtype: i32,
}

impl Architecture {
    const fn new(name: &'static str, cpu_type: i32, cpu_subtype: i32) -> Self {
        Self {
            name,
            cpu_type,
            cpu_subtype,
        }
    }

    /// Whether a slice with this (cputype, cpusubtype) is this architecture.
    /// Capability bits are ignored.
    pub fn matches(&self, cpu_type: i32, cpu_subtype: i32) -> bool {
        self.cpu_type == cpu_type
            && (self.cpu_subtype & !CPU_SUBTYPE_MASK) == (cpu_subtype & !CPU_SUBTYPE_MASK)
    }
}

/// The full known architecture universe
pub const KNOWN_ARCHITECTURES: &[Architecture] = &[
    Architecture::new("ppc", CPU_TYPE_POWERPC, 0),
    Architecture::new("ppc750", CPU_TYPE_POWERPC, 9),
    Architecture::new("ppc7400", CPU_TYPE_POWERPC, 10),
    Architecture::new("ppc7450", CPU_TYPE_POWERPC, 11),
    Architecture::new("ppc970", CPU_TYPE_POWERPC, 100),
    Architecture::new("ppc64", CPU_TYPE_POWERPC64, 0),
    Architecture::new("ppc970-64", CPU_TYPE_POWERPC64, 100),
    Architecture::new("i386", CPU_TYPE_X86, 3),
    Architecture::new("x86_64", CPU_TYPE_X86_64, 3),
    Architecture::new("x86_64h", CPU_TYPE_X86_64, 8),
    Architecture::new("armv6", CPU_TYPE_ARM, 6),
    Architecture::new("armv7", CPU_TYPE_ARM, 9),
    Architecture::new("armv7s", CPU_TYPE_ARM, 11),
    Architecture::new("armv7k", CPU_TYPE_ARM, 12),
    Architecture::new("arm64", CPU_TYPE_ARM64, 0),
    Architecture::new("arm64v8", CPU_TYPE_ARM64, 1),
    Architecture::new("arm64e", CPU_TYPE_ARM64, 2),
    Architecture::new("arm64_32", CPU_TYPE_ARM64_32, 1),
];

/// Look up an architecture by identifier
pub fn architecture_named(name: &str) -> Option<&'static Architecture> {
    KNOWN_ARCHITECTURES.iter().find(|a| a.name == name)
}

/// Identify a slice's architecture, if known
pub fn identify(cpu_type: i32, cpu_subtype: i32) -> Option<&'static Architecture> {
    KNOWN_ARCHITECTURES
        .iter()
        .find(|a| a.matches(cpu_type, cpu_subtype))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        let arm64 = architecture_named("arm64").unwrap();
        assert_eq!(arm64.cpu_type, 0x0100_000c);
        assert_eq!(arm64.cpu_subtype, 0);
        assert!(architecture_named("sparc").is_none());
    }

    #[test]
    fn test_capability_bits_ignored() {
        // arm64e slices usually carry the PTRAUTH ABI bit
        let ptrauth_subtype = 2 | 0x8000_0000_u32 as i32;
        let arch = identify(0x0100_000c, ptrauth_subtype).unwrap();
        assert_eq!(arch.name, "arm64e");

        // x86_64 with CPU_SUBTYPE_LIB64
        let arch = identify(0x0100_0007, 3 | 0x8000_0000_u32 as i32).unwrap();
        assert_eq!(arch.name, "x86_64");
    }

    #[test]
    fn test_names_unique() {
        let mut names: Vec<_> = KNOWN_ARCHITECTURES.iter().map(|a| a.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), KNOWN_ARCHITECTURES.len());
    }
}
