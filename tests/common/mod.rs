#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temporary file ending in `.{ext}`. Deleted on drop.
    pub fn create_temp_manifest(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("trellis_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_manifest(content, "yaml")
    }
}

pub mod fixtures {
    use serde::Deserialize;
    use std::path::PathBuf;
    use trellis::config::Config;
    use trellis::manifest::load_manifest;
    use trellis::router::Router;
    use trellis::validation::{FieldConstraint, FieldType, Predicate, Validatable, Validations};

    pub fn demo_manifest_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/routes.yaml")
    }

    /// Router built from the demo manifest.
    pub fn demo_router(config: &Config) -> Router {
        load_manifest(&demo_manifest_path())
            .unwrap()
            .build_router(config)
            .unwrap()
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Color {
        Red,
        Blue,
        Green,
    }

    #[derive(Debug, Deserialize)]
    pub struct CreateUser {
        pub name: String,
        pub username: String,
        pub age: i64,
        pub email: String,
        #[serde(default)]
        pub favorite_color: Option<Color>,
    }

    impl Validatable for CreateUser {
        fn validations() -> Validations {
            let mut v = Validations::new();
            v.add("email", FieldType::String, Predicate::Email)
                .add("name", FieldType::String, !Predicate::Empty)
                .add("age", FieldType::Integer, Predicate::range(18..))
                .add(
                    "username",
                    FieldType::String,
                    Predicate::count(3..) & Predicate::Alphanumeric,
                )
                .push(
                    FieldConstraint::new(
                        "favorite_color",
                        FieldType::String,
                        Predicate::nil_or(Predicate::one_of(["red", "blue", "green"])),
                    )
                    .optional()
                    .nullable(),
                );
            v
        }

        fn after_decode(&mut self) -> Result<(), trellis::Error> {
            self.name = self.name.trim().to_string();
            Ok(())
        }
    }
}
