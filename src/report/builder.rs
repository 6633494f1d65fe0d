use std::sync::Arc;
use tracing::debug;

use super::section::{Section, SectionHeader};
use crate::metric::Metric;

pub use crate::domain::DOCUMENTS_SHORT_NAME;
use crate::domain::{Project, Subject, SubjectKind, PROJECT_SHORT_NAME};

fn metrics_for(subject: &Arc<Subject>, project: &Arc<Project>) -> Vec<Metric> {
    subject
        .required_metric_kinds()
        .into_iter()
        .map(|kind| Metric::new(kind, Arc::clone(subject), Arc::clone(project)))
        .collect()
}

/// Sections of a report in output order: project, products, teams,
/// environments, documents. Subjects without metrics get no section.
pub fn build_sections(project: &Arc<Project>) -> Vec<Section> {
    let mut sections = Vec::new();

    let project_metrics = metrics_for(project.subject(), project);
    if !project_metrics.is_empty() {
        let header = SectionHeader::new(PROJECT_SHORT_NAME, "Project").with_subtitle(project.name());
        sections.push(Section::new(header, project_metrics));
    }

    let groups = [project.products(), project.teams(), project.environments()];
    for subject in groups.into_iter().flatten() {
        let metrics = metrics_for(subject, project);
        if metrics.is_empty() {
            debug!(subject = subject.name(), "No requirements, no section");
            continue;
        }
        let header = SectionHeader::new(subject.short_name(), subject.name())
            .with_subtitle(subject.kind().label());
        let mut section = Section::new(header, metrics);
        if subject.kind() == SubjectKind::Product {
            section = section.with_product(Arc::clone(subject));
        }
        sections.push(section);
    }

    let document_metrics: Vec<Metric> = project
        .documents()
        .iter()
        .flat_map(|document| metrics_for(document, project))
        .collect();
    if !document_metrics.is_empty() {
        sections.push(Section::new(
            SectionHeader::new(DOCUMENTS_SHORT_NAME, "Documents"),
            document_metrics,
        ));
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Requirement;
    use crate::metric::MetricKind;

    fn project() -> Arc<Project> {
        let project = Project::new(
            "Org",
            Subject::new(SubjectKind::Project, "Quality Report", PROJECT_SHORT_NAME)
                .with_requirements([Requirement::TrackBugs]),
        )
        .with_subject(
            Subject::new(SubjectKind::Product, "Backend", "BE")
                .with_requirements([Requirement::CodeQuality, Requirement::UnitTests]),
        )
        .with_subject(Subject::new(SubjectKind::Product, "Idle", "ID"))
        .with_subject(
            Subject::new(SubjectKind::Team, "Team", "TE")
                .with_requirements([Requirement::TrackUserStoriesInProgress]),
        )
        .with_subject(
            Subject::new(SubjectKind::Document, "Security plan", "")
                .with_requirements([Requirement::TrackSecurityTestDate]),
        )
        .with_subject(
            Subject::new(SubjectKind::Document, "Test plan", "")
                .with_requirements([Requirement::TrackSecurityTestDate]),
        );
        Arc::new(project)
    }

    #[test]
    fn sections_follow_subject_order() {
        let sections = build_sections(&project());
        let prefixes: Vec<_> = sections.iter().map(Section::id_prefix).collect();
        assert_eq!(prefixes, vec!["PC", "BE", "TE", "DC"]);

        assert_eq!(sections[0].subtitle(), Some("Quality Report"));
        assert_eq!(sections[1].title(), "Backend");
        assert_eq!(sections[1].subtitle(), Some("Product"));
        assert!(sections[1].product().is_some());
        assert!(sections[2].product().is_none());
    }

    #[test]
    fn metrics_follow_requirement_order() {
        let sections = build_sections(&project());
        let backend: Vec<_> = sections[1].metrics().iter().map(Metric::kind).collect();
        assert_eq!(
            backend,
            vec![
                MetricKind::MajorViolations,
                MetricKind::CriticalViolations,
                MetricKind::TotalLoc,
                MetricKind::UnittestLineCoverage,
                MetricKind::FailingTests,
            ]
        );
        let ids: Vec<_> = sections[3].metrics().iter().map(Metric::id).collect();
        assert_eq!(ids, vec!["DC-1", "DC-2"]);
    }
}
