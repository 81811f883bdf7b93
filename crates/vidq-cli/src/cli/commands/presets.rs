//! `vidq presets` – list format presets.

use anyhow::Result;
use vidq_core::config::VidqConfig;
use vidq_core::preset::{PostProcessor, Preset};

pub fn run_presets(cfg: &VidqConfig) -> Result<()> {
    let table = cfg.preset_table()?;
    let default = table.default_preset().name.as_str();
    println!("  {:<22} {}", "NAME", "FORMAT");
    for preset in table.iter() {
        let mark = if preset.name == default { "*" } else { " " };
        println!("{mark} {:<22} {}", preset.name, describe(preset));
    }
    Ok(())
}

/// Format selector plus merge / post-processing notes.
fn describe(preset: &Preset) -> String {
    let mut text = preset.format.clone();
    if let Some(merge) = &preset.merge_output_format {
        text.push_str(&format!(" (merge to {merge})"));
    }
    for pp in &preset.postprocessors {
        match pp {
            PostProcessor::ExtractAudio {
                preferred_codec,
                preferred_quality,
            } => {
                text.push_str(&format!(" (extract {preferred_codec}"));
                if let Some(q) = preferred_quality {
                    text.push_str(&format!(" @ {q}"));
                }
                text.push(')');
            }
        }
    }
    text
}
