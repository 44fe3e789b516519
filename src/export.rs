//! Timetable export.
//!
//! Exporters render a solved (or partially solved) week to files. They see
//! the schedule only through [`TimetableView`], the same read surface the
//! progress callbacks get, so exporting an intermediate incumbent and
//! exporting the final result are the same code path.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::models::{DayId, Model, SessionId, SlotId};

/// Read access to an assignment of sessions to times.
pub trait TimetableView {
    /// Whether the session occupies the given (day, slot), covering and
    /// not just starting there.
    fn is_scheduled_during(&self, day: DayId, slot: SlotId, session: SessionId) -> bool;
}

/// Renders timetables for one week.
///
/// `export` may be called repeatedly for the same model (intermediate
/// snapshots get `is_final = false`) and must overwrite cleanly.
pub trait Exporter {
    fn export(&mut self, model: &Model, view: &dyn TimetableView, is_final: bool) -> Result<()>;
}

/// Seconds between browser refreshes for non-final exports.
const NONFINAL_REFRESH_INTERVAL: u32 = 2;

/// Writes one HTML timetable per person and per course into a week
/// subfolder of the output folder.
///
/// The first export wipes the output folder (refusing if it contains
/// anything other than `.htm`/`.css` files) and copies `style.css` from
/// the data folder.
pub struct HtmlExporter {
    data_folder: PathBuf,
    output_folder: PathBuf,
    output_folder_cleaned: bool,
}

impl HtmlExporter {
    pub fn new(data_folder: impl Into<PathBuf>, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            data_folder: data_folder.into(),
            output_folder: output_folder.into(),
            output_folder_cleaned: false,
        }
    }

    fn clean_output_folder(&self) -> Result<()> {
        if self.output_folder.exists() {
            if !delete_safety_check(&self.output_folder)? {
                return Err(Error::resource_msg(format!(
                    "refusing to clean export directory '{}': it contains files not ending in .htm or .css",
                    self.output_folder.display()
                )));
            }
            for entry in read_dir(&self.output_folder)? {
                let path = entry?.path();
                let removed = if path.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                removed.map_err(|e| {
                    Error::resource(format!("could not clean '{}'", path.display()), e)
                })?;
            }
        } else {
            fs::create_dir_all(&self.output_folder).map_err(|e| {
                Error::resource(
                    format!(
                        "could not create export directory '{}'",
                        self.output_folder.display()
                    ),
                    e,
                )
            })?;
        }

        let css_source = self.data_folder.join("style.css");
        fs::copy(&css_source, self.output_folder.join("style.css")).map_err(|e| {
            Error::resource(
                format!(
                    "could not copy style.css from data folder '{}' to output folder '{}'",
                    self.data_folder.display(),
                    self.output_folder.display()
                ),
                e,
            )
        })?;
        Ok(())
    }

    fn write_timetable(
        &self,
        model: &Model,
        file: &Path,
        timetable_name: &str,
        cells: &[Vec<String>], // [slot][day]
        is_final: bool,
    ) -> Result<()> {
        let mut html = String::new();
        html.push_str("<html><head><meta charset=\"UTF-8\">");
        html.push_str(&format!(
            "<title>Schedule for {}</title>",
            sanitize(timetable_name)
        ));
        if !is_final {
            html.push_str(&format!(
                "<meta http-equiv=\"refresh\" content=\"{NONFINAL_REFRESH_INTERVAL}\">"
            ));
        }
        html.push_str("<link rel=\"stylesheet\" href=\"../style.css\"></head><body><table>");

        html.push_str("<tr>");
        html.push_str(&format!(
            "<td class=\"personheader\">{}<br>Timetable for:<br>{}</td>",
            sanitize(&model.model_name),
            timetable_name
        ));
        for day in model.day_ids() {
            html.push_str(&format!("<td class=\"day\">{}</td>", model.day(day).name));
        }
        html.push_str("</tr>");

        for slot in model.slot_ids() {
            html.push_str("<tr>");
            html.push_str(&format!(
                "<td class=\"time\">{}</td>",
                model.slot(slot).label()
            ));
            for day in model.day_ids() {
                html.push_str(&cells[slot.0][day.0]);
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></body></html>");

        let mut out = fs::File::create(file)
            .map_err(|e| Error::resource(format!("could not create '{}'", file.display()), e))?;
        out.write_all(html.as_bytes())
            .map_err(|e| Error::resource(format!("could not write '{}'", file.display()), e))?;
        Ok(())
    }

    /// Cell content for one (day, slot): every scheduled session rendered
    /// as a block, with continuation markers below a session's first slot.
    fn build_cell(
        model: &Model,
        view: &dyn TimetableView,
        day: DayId,
        slot: SlotId,
        sessions: &[SessionId],
        person_view: Option<crate::models::PersonId>,
    ) -> String {
        let mut content = String::new();
        for &session in sessions {
            if !view.is_scheduled_during(day, slot, session) {
                continue;
            }
            let continues = model
                .previous_slot(slot)
                .is_some_and(|prev| view.is_scheduled_during(day, prev, session));
            if continues {
                content.insert_str(
                    0,
                    "<div class=\"continue\">&#8226;<br>&#8226;<br>&#8226;</div>",
                );
                continue;
            }

            let s = model.session(session);
            content.push_str("<div>");
            content.push_str(&model.course(s.course).name);
            let groups: Vec<&str> = s.groups.iter().map(String::as_str).collect();
            content.push_str(&format!(" [{}]", groups.join(", ")));
            if let Some(session_type) = &s.session_type {
                content.push_str(&format!(" ({session_type})"));
            }
            if let Some(person) = person_view {
                if s.has_staff(person) {
                    content.push_str(" [STAFF]");
                }
            }
            if let Some(title) = &s.title {
                content.push_str(&format!("<br>{title}"));
            }
            if let Some(room) = s.room {
                content.push_str(&format!("<br>{}", model.room(room).name));
            }
            content.push_str("</div>");
        }
        format!("<td>{content}</td>")
    }
}

impl Exporter for HtmlExporter {
    fn export(&mut self, model: &Model, view: &dyn TimetableView, is_final: bool) -> Result<()> {
        if !self.output_folder_cleaned {
            self.clean_output_folder()?;
            self.output_folder_cleaned = true;
        }

        let model_folder = self.output_folder.join(sanitize(&model.model_name));
        if !model_folder.exists() {
            fs::create_dir(&model_folder).map_err(|e| {
                Error::resource(
                    format!(
                        "could not create export directory '{}'",
                        model_folder.display()
                    ),
                    e,
                )
            })?;
        }

        for person in model.person_ids() {
            let sessions: Vec<SessionId> =
                model.person(person).sessions().iter().copied().collect();
            let cells: Vec<Vec<String>> = model
                .slot_ids()
                .map(|slot| {
                    model
                        .day_ids()
                        .map(|day| {
                            Self::build_cell(model, view, day, slot, &sessions, Some(person))
                        })
                        .collect()
                })
                .collect();

            let name = &model.person(person).name;
            let file = model_folder.join(format!(
                "{}_Person_{}.htm",
                sanitize(&model.model_name),
                sanitize(name)
            ));
            self.write_timetable(model, &file, name, &cells, is_final)?;
        }

        for course in model.course_ids() {
            let sessions = model.sessions_in_group(course, None);
            let cells: Vec<Vec<String>> = model
                .slot_ids()
                .map(|slot| {
                    model
                        .day_ids()
                        .map(|day| Self::build_cell(model, view, day, slot, &sessions, None))
                        .collect()
                })
                .collect();

            let name = &model.course(course).name;
            let file = model_folder.join(format!(
                "{}_Course_{}.htm",
                sanitize(&model.model_name),
                sanitize(name)
            ));
            self.write_timetable(model, &file, name, &cells, is_final)?;
        }

        debug!(
            "exported {} ({})",
            model.model_name,
            if is_final { "final" } else { "intermediate" }
        );
        Ok(())
    }
}

fn read_dir(path: &Path) -> Result<fs::ReadDir> {
    fs::read_dir(path)
        .map_err(|e| Error::resource(format!("could not read directory '{}'", path.display()), e))
}

/// Strips every character that is not safe in a timetable filename.
fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || "æøåÆØÅ-_ ".contains(*c))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Whether the folder holds only exporter-generated content.
fn delete_safety_check(folder: &Path) -> Result<bool> {
    for entry in read_dir(folder)? {
        let path = entry?.path();
        if path.is_dir() {
            if !delete_safety_check(&path)? {
                return Ok(false);
            }
        } else {
            let generated = path
                .extension()
                .is_some_and(|ext| ext == "htm" || ext == "css");
            if !generated {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::models::{DayId, SlotId};

    /// Fixed schedule stub standing in for a solved model.
    struct FixedView {
        starts: BTreeMap<SessionId, (DayId, SlotId)>,
        model_lengths: BTreeMap<SessionId, usize>,
    }

    impl TimetableView for FixedView {
        fn is_scheduled_during(&self, day: DayId, slot: SlotId, session: SessionId) -> bool {
            let Some(&(d, start)) = self.starts.get(&session) else {
                return false;
            };
            let length = self.model_lengths.get(&session).copied().unwrap_or(1);
            d == day && slot.0 >= start.0 && slot.0 < start.0 + length
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "timetabler-export-{}-{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample() -> (Model, FixedView) {
        let mut model = Model::new(2, 8);
        model.add_days(["Monday", "Tuesday"]);
        model.add_slots(3);
        model.add_room("Lab 1");
        let course = model.add_course("Algebra");
        let session = model.add_session(
            course,
            Some("lecture".into()),
            Some("Intro".into()),
            BTreeSet::from(["A1".to_string()]),
            2,
            Some(crate::models::RoomId(0)),
            0,
        );
        let alice = model.find_add_person("Alice");
        model.add_student(session, alice);

        let view = FixedView {
            starts: BTreeMap::from([(session, (DayId(0), SlotId(1)))]),
            model_lengths: BTreeMap::from([(session, 2usize)]),
        };
        (model, view)
    }

    #[test]
    fn test_export_writes_person_and_course_files() {
        let root = temp_dir("files");
        let data = root.join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("style.css"), "td { border: 1px solid; }").unwrap();
        let out = root.join("schedules");

        let (model, view) = sample();
        let mut exporter = HtmlExporter::new(&data, &out);
        exporter.export(&model, &view, true).unwrap();

        assert!(out.join("style.css").exists());
        let week = out.join("Week_2");
        let person_file = week.join("Week_2_Person_Alice.htm");
        let course_file = week.join("Week_2_Course_Algebra.htm");
        assert!(person_file.exists());
        assert!(course_file.exists());

        let html = fs::read_to_string(person_file).unwrap();
        assert!(html.contains("Algebra"));
        assert!(html.contains("(lecture)"));
        assert!(html.contains("Lab 1"));
        assert!(html.contains("continue")); // second slot of the session
        assert!(!html.contains("http-equiv")); // final export, no refresh

        // Re-export must overwrite cleanly.
        exporter.export(&model, &view, false).unwrap();
        let html = fs::read_to_string(week.join("Week_2_Person_Alice.htm")).unwrap();
        assert!(html.contains("http-equiv=\"refresh\""));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_refuses_to_clean_foreign_files() {
        let root = temp_dir("foreign");
        let data = root.join("data");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("style.css"), "").unwrap();
        let out = root.join("schedules");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("notes.txt"), "precious").unwrap();

        let (model, view) = sample();
        let mut exporter = HtmlExporter::new(&data, &out);
        let err = exporter.export(&model, &view, true).unwrap_err();
        assert!(matches!(err, Error::Resource { .. }));
        assert!(out.join("notes.txt").exists());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_sanitize_strips_unsafe_characters() {
        assert_eq!(sanitize("Week 2"), "Week_2");
        assert_eq!(sanitize("Lab 3/4: øvelse"), "Lab_34_øvelse");
    }
}
