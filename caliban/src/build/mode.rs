use std::fmt;

/// The execution mode a container is built and scheduled for.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, clap::ValueEnum)]
pub enum Mode {
    Cpu,
    Gpu,
    TpuHost,
}

impl Mode {
    pub fn is_gpu(&self) -> bool {
        matches!(self, Mode::Gpu)
    }

    pub fn default_base_image(&self) -> &'static str {
        match self {
            Mode::Cpu => "dlvm:common-cpu",
            Mode::Gpu => "dlvm:common-gpu",
            Mode::TpuHost => "dlvm:tf2-tpu",
        }
    }

    /// Expands a short-form base image like `dlvm:tf2-gpu-{}` by substituting the mode tag into
    /// the single `{}` placeholder, if present.
    pub fn expand_placeholder(&self, template: &str) -> String {
        let tag = match self {
            Mode::Cpu => "cpu",
            Mode::Gpu => "gpu",
            Mode::TpuHost => "tpu",
        };
        template.replace("{}", tag)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Cpu => "cpu",
            Mode::Gpu => "gpu",
            Mode::TpuHost => "tpu-host",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_expansion() {
        assert_eq!(Mode::Gpu.expand_placeholder("dlvm:tf2-{}-2.2"), "dlvm:tf2-gpu-2.2");
        assert_eq!(Mode::Cpu.expand_placeholder("dlvm:tf2-{}-2.2"), "dlvm:tf2-cpu-2.2");
    }
}
