use swiftmock_core::GenerationReport;

pub fn format_summary(report: &GenerationReport) -> String {
    let mut lines = vec![format!(
        "✅ Generated {} mock(s) in {}",
        report.rendered,
        report.destination.display()
    )];
    lines.push(format!(
        "   • Scanned {} source file(s), found {} annotated declaration(s)",
        report.source_files, report.entities
    ));
    if report.mock_files > 0 {
        lines.push(format!(
            "   • Reused {} pre-generated mock(s) from {} file(s)",
            report.stand_ins, report.mock_files
        ));
    }
    if !report.failed_files.is_empty() {
        lines.push(format!(
            "⚠️  Could not process {} file(s):",
            report.failed_files.len()
        ));
        for path in &report.failed_files {
            lines.push(format!("   • {}", path.display()));
        }
    }
    let skipped = report.failures.len().saturating_sub(report.failed_files.len());
    if skipped > 0 {
        lines.push(format!(
            "⚠️  Skipped {skipped} declaration(s) that cannot be mocked (run with -v 1 for details)"
        ));
    }
    lines.join("\n")
}

pub fn print_summary(report: &GenerationReport) {
    println!("{}", format_summary(report));
}
