//! Problem import.
//!
//! The problem description is one JSON document covering every week;
//! importing populates a single week's model with the courses, sessions
//! and students scheduled for that week. Structural errors are fatal and
//! carry the path of the offending field, e.g.
//! `courses->Algebra->[0]->length`.
//!
//! # Format
//!
//! ```json
//! {
//!   "courses": {
//!     "Algebra": [
//!       {
//!         "weeks": [2, 3], "groups": ["A1", "A2"], "type": "exercise",
//!         "length": 2, "room": "Lab", "roombreak": 1,
//!         "staff": ["Carol", "Dave"],
//!         "denytimes": { "days": "Monday", "hours": [8, 9] }
//!       }
//!     ]
//!   },
//!   "students": {
//!     "Alice": {
//!       "attendance": [ { "course": "Algebra", "groups": ["A1"] } ],
//!       "weight": 2.0
//!     }
//!   }
//! }
//! ```
//!
//! Fields accepting a list also accept a single value (`"weeks": 2`). A
//! spec with `"shared": true` creates one session attended by all its
//! groups; otherwise one session is created per group, and a `staff` list
//! must then be absent, a single name, one name per group, or one list of
//! names per group. `times` forces starts into the listed patterns,
//! `denytimes` forbids coverage of them; omitted `days`/`hours` widen a
//! pattern to every day or hour.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use log::debug;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{CourseId, Model, SessionId};

/// Populates one week's model from an external problem description.
pub trait Importer {
    /// Returns the number of sessions imported for the model's week.
    fn import_problem(&self, model: &mut Model) -> Result<usize>;
}

/// Importer for the JSON problem format.
pub struct JsonImporter {
    file_path: PathBuf,
}

impl JsonImporter {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

impl Importer for JsonImporter {
    fn import_problem(&self, model: &mut Model) -> Result<usize> {
        let text = fs::read_to_string(&self.file_path).map_err(|e| {
            Error::resource(
                format!(
                    "could not read problem description '{}'",
                    self.file_path.display()
                ),
                e,
            )
        })?;
        let root: Value = serde_json::from_str(&text)
            .map_err(|e| Error::input("<document>", e.to_string()))?;

        let imported = import_courses(model, &root)?;
        import_students(model, &root)?;
        debug!("imported {imported} sessions for {}", model.model_name);
        Ok(imported)
    }
}

fn import_courses(model: &mut Model, root: &Value) -> Result<usize> {
    let courses_path = JsonPath::root("courses");
    let courses = assert_object(root.get("courses"), &courses_path)?;
    let mut imported = 0;

    for (course_name, specs_node) in courses {
        let course_path = courses_path.field(course_name);
        let specs = assert_array(Some(specs_node), &course_path)?;

        for (spec_index, spec_node) in specs.iter().enumerate() {
            let spec_path = course_path.index(spec_index);
            let spec = assert_object(Some(spec_node), &spec_path)?;

            for week_node in listify(spec.get("weeks")) {
                // Only the specs naming the week being scheduled apply.
                if assert_integer(week_node, &spec_path.field("weeks"))? != i64::from(model.week) {
                    continue;
                }

                let shared = match spec.get("shared") {
                    Some(node) => assert_bool(Some(node), &spec_path.field("shared"))?,
                    None => false,
                };

                if shared {
                    // One session attended by every group.
                    let mut groups = BTreeSet::new();
                    for group in listify(spec.get("groups")) {
                        groups.insert(
                            assert_string(group, &spec_path.field("groups"))?.to_string(),
                        );
                    }
                    let course = model.find_add_course(course_name);
                    let session = parse_session(model, spec, &spec_path, course, groups)?;
                    imported += 1;

                    if spec.contains_key("staff") {
                        for staff in listify(spec.get("staff")) {
                            let name = assert_string(staff, &spec_path.field("staff"))?.to_string();
                            let person = model.find_add_person(&name);
                            model.add_staff(session, person);
                        }
                    }
                } else {
                    // One session per group.
                    let groups = listify(spec.get("groups"));
                    for (group_index, group) in groups.iter().enumerate() {
                        let group_name =
                            assert_string(*group, &spec_path.field("groups"))?.to_string();
                        let course = model.find_add_course(course_name);
                        let session = parse_session(
                            model,
                            spec,
                            &spec_path,
                            course,
                            BTreeSet::from([group_name]),
                        )?;
                        imported += 1;

                        if spec.contains_key("staff") {
                            let staffs = listify(spec.get("staff"));
                            if staffs.len() == 1 {
                                let name =
                                    assert_string(staffs[0], &spec_path.field("staff"))?.to_string();
                                let person = model.find_add_person(&name);
                                model.add_staff(session, person);
                            } else {
                                if staffs.len() != groups.len() {
                                    return Err(Error::input(
                                        spec_path.field("staff").to_string(),
                                        "staff must be one of: absent, a single name used for \
                                         all groups, one name per group, or one list of names \
                                         per group",
                                    ));
                                }
                                for staff in listify(staffs[group_index]) {
                                    let name = assert_string(staff, &spec_path.field("staff"))?
                                        .to_string();
                                    let person = model.find_add_person(&name);
                                    model.add_staff(session, person);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(imported)
}

fn parse_session(
    model: &mut Model,
    spec: &Map<String, Value>,
    spec_path: &JsonPath,
    course: CourseId,
    groups: BTreeSet<String>,
) -> Result<SessionId> {
    let room = match assert_string_or_null(spec.get("room"), &spec_path.field("room"))? {
        Some(name) => Some(model.find_room(name)?),
        None => None,
    };
    let session_type = assert_string_or_null(spec.get("type"), &spec_path.field("type"))?
        .map(str::to_string);
    let title =
        assert_string_or_null(spec.get("title"), &spec_path.field("title"))?.map(str::to_string);

    let length_path = spec_path.field("length");
    let length = assert_integer(spec.get("length"), &length_path)?;
    if length < 1 {
        return Err(Error::input(
            length_path.to_string(),
            "session length must be a positive number of slots",
        ));
    }

    let room_break = match spec.get("roombreak") {
        Some(node) => {
            let path = spec_path.field("roombreak");
            let value = assert_integer(Some(node), &path)?;
            if value < 0 {
                return Err(Error::input(path.to_string(), "room break cannot be negative"));
            }
            value
        }
        None => 0,
    };

    let session = model.add_session(
        course,
        session_type,
        title,
        groups,
        length as usize,
        room,
        room_break as usize,
    );

    if spec.contains_key("times") {
        add_session_times(model, session, true, spec.get("times"), &spec_path.field("times"))?;
    }
    if spec.contains_key("denytimes") {
        add_session_times(
            model,
            session,
            false,
            spec.get("denytimes"),
            &spec_path.field("denytimes"),
        )?;
    }

    Ok(session)
}

fn add_session_times(
    model: &mut Model,
    session: SessionId,
    whitelisting: bool,
    specs: Option<&Value>,
    path: &JsonPath,
) -> Result<()> {
    for time_spec in listify(specs) {
        let time = assert_object(time_spec, path)?;

        // Every listed day is combined with every listed hour; a missing
        // axis means "any".
        for day_spec in listify(time.get("days")) {
            for hour_spec in listify(time.get("hours")) {
                let days_path = path.field("days");
                let day = match assert_string_or_null(day_spec, &days_path)? {
                    Some(name) => Some(model.find_day(name).ok_or_else(|| {
                        Error::input(days_path.to_string(), format!("unknown day '{name}'"))
                    })?),
                    None => None,
                };

                let hours_path = path.field("hours");
                let slot = match assert_integer_or_null(hour_spec, &hours_path)? {
                    Some(hour) => {
                        let found = u32::try_from(hour).ok().and_then(|h| model.find_slot(h));
                        Some(found.ok_or_else(|| {
                            Error::input(
                                hours_path.to_string(),
                                format!("no slot starts at hour {hour}"),
                            )
                        })?)
                    }
                    None => None,
                };

                if whitelisting {
                    model.whitelist_time(session, (day, slot))?;
                } else {
                    model.blacklist_time(session, (day, slot))?;
                }
            }
        }
    }
    Ok(())
}

fn import_students(model: &mut Model, root: &Value) -> Result<()> {
    let students_path = JsonPath::root("students");
    let students = assert_object(root.get("students"), &students_path)?;

    for (student_name, student_node) in students {
        let student_path = students_path.field(student_name);
        let attendance_path = student_path.field("attendance");
        let attendance = assert_array(student_node.get("attendance"), &attendance_path)?;

        for (spec_index, spec_node) in attendance.iter().enumerate() {
            let spec_path = attendance_path.index(spec_index);
            let spec = assert_object(Some(spec_node), &spec_path)?;
            let course_path = spec_path.field("course");
            let course_name = assert_string(spec.get("course"), &course_path)?;

            // The course must exist somewhere in the input, even if it has
            // no sessions this week.
            let declared = root
                .get("courses")
                .and_then(|courses| courses.get(course_name))
                .is_some();
            if !declared {
                return Err(Error::input(
                    course_path.to_string(),
                    format!("could not find specifications for course '{course_name}'"),
                ));
            }

            // No sessions this week: the enrollment simply does not apply.
            let Some(course) = model.find_course(course_name) else {
                continue;
            };

            for group in listify(spec.get("groups")) {
                let group_name = assert_string(group, &spec_path.field("groups"))?;
                for session in model.sessions_in_group(course, Some(group_name)) {
                    let person = model.find_add_person(student_name);
                    model.add_student(session, person);
                }
            }
        }

        if let Some(weight_node) = student_node.get("weight") {
            let weight = assert_number(Some(weight_node), &student_path.field("weight"))?;
            let person = model.find_add_person(student_name);
            model.set_person_weight(person, weight);
        }
    }

    // A session nobody attends points at a broken input file.
    for session in model.session_ids() {
        if model.session(session).students().is_empty() {
            return Err(Error::input(
                "students",
                format!(
                    "no students are registered for session {}",
                    model.session_label(session)
                ),
            ));
        }
    }

    Ok(())
}

/// Normalizes single-value-or-array fields: a missing field or JSON null
/// becomes one absent element, a plain value one present element, and an
/// array its elements (with nulls absent).
fn listify(node: Option<&Value>) -> Vec<Option<&Value>> {
    match node {
        None | Some(Value::Null) => vec![None],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| if item.is_null() { None } else { Some(item) })
            .collect(),
        Some(other) => vec![Some(other)],
    }
}

/// Structural location within the JSON document, for error messages.
#[derive(Debug, Clone)]
struct JsonPath {
    elements: Vec<String>,
}

impl JsonPath {
    fn root(name: &str) -> Self {
        Self {
            elements: vec![name.to_string()],
        }
    }

    fn field(&self, name: &str) -> Self {
        let mut elements = self.elements.clone();
        elements.push(name.to_string());
        Self { elements }
    }

    fn index(&self, index: usize) -> Self {
        let mut elements = self.elements.clone();
        elements.push(format!("[{index}]"));
        Self { elements }
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elements.join("->"))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn exists<'a>(node: Option<&'a Value>, path: &JsonPath) -> Result<&'a Value> {
    node.ok_or_else(|| Error::input(path.to_string(), "the field does not exist as expected"))
}

fn wrong_type(path: &JsonPath, actual: &Value, expected: &str) -> Error {
    Error::input(
        path.to_string(),
        format!(
            "the field (or an element of it) is of type {} but {expected} was expected",
            type_name(actual)
        ),
    )
}

fn assert_object<'a>(node: Option<&'a Value>, path: &JsonPath) -> Result<&'a Map<String, Value>> {
    let value = exists(node, path)?;
    let object = value
        .as_object()
        .ok_or_else(|| wrong_type(path, value, "object"))?;
    if object.is_empty() {
        return Err(Error::input(path.to_string(), "the field is empty"));
    }
    Ok(object)
}

fn assert_array<'a>(node: Option<&'a Value>, path: &JsonPath) -> Result<&'a [Value]> {
    let value = exists(node, path)?;
    let array = value
        .as_array()
        .ok_or_else(|| wrong_type(path, value, "array"))?;
    if array.is_empty() {
        return Err(Error::input(path.to_string(), "the field is empty"));
    }
    Ok(array)
}

fn assert_string<'a>(node: Option<&'a Value>, path: &JsonPath) -> Result<&'a str> {
    let value = exists(node, path)?;
    value
        .as_str()
        .ok_or_else(|| wrong_type(path, value, "string"))
}

fn assert_string_or_null<'a>(node: Option<&'a Value>, path: &JsonPath) -> Result<Option<&'a str>> {
    match node {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| wrong_type(path, value, "string")),
    }
}

fn assert_integer(node: Option<&Value>, path: &JsonPath) -> Result<i64> {
    let value = exists(node, path)?;
    value
        .as_i64()
        .ok_or_else(|| wrong_type(path, value, "integer"))
}

fn assert_integer_or_null(node: Option<&Value>, path: &JsonPath) -> Result<Option<i64>> {
    match node {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| wrong_type(path, value, "integer")),
    }
}

fn assert_number(node: Option<&Value>, path: &JsonPath) -> Result<f64> {
    let value = exists(node, path)?;
    value
        .as_f64()
        .ok_or_else(|| wrong_type(path, value, "number"))
}

fn assert_bool(node: Option<&Value>, path: &JsonPath) -> Result<bool> {
    let value = exists(node, path)?;
    value
        .as_bool()
        .ok_or_else(|| wrong_type(path, value, "boolean"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotId;

    const PROBLEM: &str = r#"
    {
        "courses": {
            "Algebra": [
                {
                    "weeks": [2, 3],
                    "groups": ["A1", "A2"],
                    "type": "exercise",
                    "length": 2,
                    "room": "Lab",
                    "roombreak": 1,
                    "staff": ["Carol", "Dave"],
                    "denytimes": { "days": "Monday", "hours": [8, 9] }
                },
                {
                    "weeks": 2,
                    "shared": true,
                    "groups": ["A1", "A2"],
                    "type": "lecture",
                    "title": "Intro",
                    "length": 1,
                    "staff": ["Carol", "Dave"],
                    "times": { "days": ["Tuesday"], "hours": 10 }
                }
            ]
        },
        "students": {
            "Alice": {
                "attendance": [ { "course": "Algebra", "groups": ["A1"] } ],
                "weight": 2.0
            },
            "Bob": {
                "attendance": [ { "course": "Algebra", "groups": ["A2"] } ]
            }
        }
    }
    "#;

    fn write_problem(tag: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "timetabler-import-{tag}-{}.json",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    fn week_model(week: u32) -> Model {
        let mut model = Model::new(week, 8);
        model.add_days(["Monday", "Tuesday", "Wednesday"]);
        model.add_slots(4);
        model.add_room("Lab");
        model
    }

    fn import(tag: &str, contents: &str, week: u32) -> Result<(Model, usize)> {
        let path = write_problem(tag, contents);
        let importer = JsonImporter::new(&path);
        let mut model = week_model(week);
        let imported = importer.import_problem(&mut model);
        let _ = fs::remove_file(&path);
        imported.map(|count| (model, count))
    }

    #[test]
    fn test_full_problem_round_trip() {
        let (model, imported) = import("full", PROBLEM, 2).unwrap();
        assert_eq!(imported, 3); // two exercise groups + one shared lecture
        assert_eq!(model.session_count(), 3);

        let alice = model.find_person("Alice").unwrap();
        assert_eq!(model.person(alice).sessions().len(), 2); // A1 exercise + lecture
        assert_eq!(model.person(alice).weight, 2.0);
        let bob = model.find_person("Bob").unwrap();
        assert_eq!(model.person(bob).weight, 1.0);

        // Per-group staff assignment.
        let carol = model.find_person("Carol").unwrap();
        let dave = model.find_person("Dave").unwrap();
        let a1_exercise = crate::models::SessionId(0);
        let a2_exercise = crate::models::SessionId(1);
        let lecture = crate::models::SessionId(2);
        assert!(model.session(a1_exercise).has_staff(carol));
        assert!(!model.session(a1_exercise).has_staff(dave));
        assert!(model.session(a2_exercise).has_staff(dave));
        assert!(model.session(lecture).has_staff(carol));
        assert!(model.session(lecture).has_staff(dave));

        // Session details.
        let exercise = model.session(a1_exercise);
        assert_eq!(exercise.length, 2);
        assert_eq!(exercise.room, Some(crate::models::RoomId(0)));
        assert_eq!(exercise.room_break, 1);
        assert_eq!(exercise.blacklisted_times().len(), 2); // Monday 8 and 9
        let monday = model.find_day("Monday").unwrap();
        assert_eq!(
            exercise.blacklisted_times()[0],
            (Some(monday), Some(SlotId(0)))
        );

        let tuesday = model.find_day("Tuesday").unwrap();
        assert_eq!(
            model.session(lecture).whitelisted_times(),
            &[(Some(tuesday), Some(SlotId(2)))]
        );
        assert_eq!(model.session(lecture).groups.len(), 2);
    }

    #[test]
    fn test_other_weeks_import_nothing() {
        let path = write_problem("other-week", PROBLEM);
        let importer = JsonImporter::new(&path);
        let mut model = week_model(9);
        let imported = importer.import_problem(&mut model).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(imported, 0);
        assert_eq!(model.session_count(), 0);
    }

    #[test]
    fn test_wrong_type_reports_structural_path() {
        let broken = PROBLEM.replace("\"length\": 2,", "\"length\": \"two\",");
        let err = import("bad-length", &broken, 2).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("courses->Algebra->[0]->length"), "{message}");
        assert!(message.contains("string"), "{message}");
    }

    #[test]
    fn test_unknown_course_reference_is_fatal() {
        let broken = PROBLEM.replace("{ \"course\": \"Algebra\", \"groups\": [\"A1\"] }",
            "{ \"course\": \"Geometry\", \"groups\": [\"A1\"] }");
        let err = import("dangling", &broken, 2).unwrap_err();
        assert!(err.to_string().contains("Geometry"));
    }

    #[test]
    fn test_session_without_students_is_fatal() {
        let broken = PROBLEM.replace("\"groups\": [\"A2\"]", "\"groups\": [\"A1\"]");
        let err = import("unattended", &broken, 2).unwrap_err();
        assert!(err.to_string().contains("no students are registered"));
    }

    #[test]
    fn test_staff_list_cardinality_mismatch_is_fatal() {
        let broken = PROBLEM.replace(
            "\"groups\": [\"A1\", \"A2\"],\n                    \"type\": \"exercise\"",
            "\"groups\": [\"A1\", \"A2\", \"A3\"],\n                    \"type\": \"exercise\"",
        );
        let err = import("staff-cardinality", &broken, 2).unwrap_err();
        assert!(err.to_string().contains("staff"));
    }

    #[test]
    fn test_unknown_room_is_fatal() {
        let broken = PROBLEM.replace("\"room\": \"Lab\",", "\"room\": \"Aud 9\",");
        let err = import("bad-room", &broken, 2).unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }

    #[test]
    fn test_missing_required_field_is_fatal() {
        let broken = PROBLEM.replace("\"length\": 2,", "");
        let err = import("no-length", &broken, 2).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_listify_shapes() {
        let array = serde_json::json!([1, null, 2]);
        let items = listify(Some(&array));
        assert_eq!(items.len(), 3);
        assert!(items[0].is_some());
        assert!(items[1].is_none());

        let single = serde_json::json!("Monday");
        assert_eq!(listify(Some(&single)).len(), 1);
        assert_eq!(listify(None).len(), 1);
        assert!(listify(None)[0].is_none());
    }
}
