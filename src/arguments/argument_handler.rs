use std::collections::HashMap;
use std::env;

/// A typed table of command line arguments of the form `-name=value`,
/// organized into categories for the help printout.
pub struct ArgumentHandler {
    categories: HashMap<String, Category>,
    arguments_integer: HashMap<String, IntegerEntry>,
    arguments_string: HashMap<String, StringEntry>,
    arguments_bool: HashMap<String, BoolEntry>,
}

impl ArgumentHandler {
    pub fn new() -> ArgumentHandler {
        ArgumentHandler {
            categories: HashMap::new(),
            arguments_integer: HashMap::new(),
            arguments_string: HashMap::new(),
            arguments_bool: HashMap::new(),
        }
    }

    pub fn print_help_summary_if_needed_and_exit(&self) {
        if !env::args().skip(1).any(|arg| arg.starts_with("-help")) {
            return;
        }

        println!("----------------------");
        println!("Displaying argument help information.");
        for (category_name, category) in &self.categories {
            println!("----------------------");
            println!("Category: {}. {}", category_name, category.short_description);
            for argument in &category.arguments {
                match argument.data_type {
                    DataType::Integer => {
                        let info = self.arguments_integer.get(&argument.name).unwrap();
                        println!("\t-{}. Integer. {}", argument.name, info.short_description);
                        println!("\t\tDefault: {}", info.default_value);
                        println!("\t\tRange = [{}, {}]", info.min_value, info.max_value);
                    }
                    DataType::String => {
                        let info = self.arguments_string.get(&argument.name).unwrap();
                        println!("\t-{}. String. {}", argument.name, info.short_description);
                        println!("\t\tDefault: {}", info.default_value);
                        if info.allowed_values.is_empty() {
                            println!("\t\tAllowed values = [any string, no restrictions]");
                        } else {
                            println!(
                                "\t\tAllowed values = {{{}}}",
                                info.allowed_values.join(", ")
                            );
                        }
                    }
                    DataType::Bool => {
                        let info = self.arguments_bool.get(&argument.name).unwrap();
                        println!("\t-{}. Bool. {}", argument.name, info.short_description);
                        println!("\t\tDefault: {}", info.default_value);
                    }
                }
            }
        }
        println!("----------------------");
        std::process::exit(0);
    }

    pub fn print_arguments_different_from_default(&self) {
        println!("----------------------");
        println!("Displaying arguments whose value differs from the default.");
        let mut at_least_one_argument_is_different = false;
        for (category_name, category) in &self.categories {
            println!("----------------------");
            println!("Category: {}.", category_name);
            for argument in &category.arguments {
                match argument.data_type {
                    DataType::Integer => {
                        let info = self.arguments_integer.get(&argument.name).unwrap();
                        if info.current_value != info.default_value {
                            at_least_one_argument_is_different = true;
                            println!(
                                "\t-{}={} (default: {})",
                                argument.name, info.current_value, info.default_value
                            );
                        }
                    }
                    DataType::String => {
                        let info = self.arguments_string.get(&argument.name).unwrap();
                        if info.current_value != info.default_value {
                            at_least_one_argument_is_different = true;
                            println!(
                                "\t-{}={} (default: {})",
                                argument.name, info.current_value, info.default_value
                            );
                        }
                    }
                    DataType::Bool => {
                        let info = self.arguments_bool.get(&argument.name).unwrap();
                        if info.current_value != info.default_value {
                            at_least_one_argument_is_different = true;
                            println!(
                                "\t-{}={} (default: {})",
                                argument.name, info.current_value, info.default_value
                            );
                        }
                    }
                }
            }
        }
        if !at_least_one_argument_is_different {
            println!("\tAll arguments are set to their default values.");
        }
        println!("----------------------");
    }

    fn get_argument_type(&self, name: &str) -> Option<DataType> {
        if self.arguments_integer.contains_key(name) {
            Some(DataType::Integer)
        } else if self.arguments_bool.contains_key(name) {
            Some(DataType::Bool)
        } else if self.arguments_string.contains_key(name) {
            Some(DataType::String)
        } else {
            None
        }
    }

    pub fn get_integer_argument(&self, argument_name: &str) -> i64 {
        self.arguments_integer
            .get(argument_name)
            .unwrap_or_else(|| panic!("Unknown integer argument: {argument_name}"))
            .current_value
    }

    pub fn get_string_argument(&self, argument_name: &str) -> String {
        self.arguments_string
            .get(argument_name)
            .unwrap_or_else(|| panic!("Unknown string argument: {argument_name}"))
            .current_value
            .clone()
    }

    pub fn get_bool_argument(&self, argument_name: &str) -> bool {
        self.arguments_bool
            .get(argument_name)
            .unwrap_or_else(|| panic!("Unknown bool argument: {argument_name}"))
            .current_value
    }

    pub fn set_integer_argument(&mut self, argument_name: &str, value: i64) {
        assert!(self.arguments_integer.contains_key(argument_name));

        let entry = self.arguments_integer.get_mut(argument_name).unwrap();

        assert!(
            entry.min_value <= value && value <= entry.max_value,
            "The value '{value}' supplied for argument '{argument_name}' is not within the allowed range [{}, {}]",
            entry.min_value,
            entry.max_value
        );

        entry.current_value = value;
    }

    pub fn set_string_argument(&mut self, argument_name: &str, value: &str) {
        assert!(self.arguments_string.contains_key(argument_name));

        let entry = self.arguments_string.get_mut(argument_name).unwrap();

        assert!(
            entry.allowed_values.is_empty() || entry.allowed_values.iter().any(|s| *s == value),
            "The value '{value}' supplied for argument '{argument_name}' is not within the allowed values ({{{}}}).",
            entry.allowed_values.join(", ")
        );

        entry.current_value = value.to_string();
    }

    pub fn set_bool_argument(&mut self, argument_name: &str, value: bool) {
        assert!(self.arguments_bool.contains_key(argument_name));

        self.arguments_bool
            .get_mut(argument_name)
            .unwrap()
            .current_value = value;
    }

    pub fn parse_command_line_arguments(&mut self) {
        //skip the first argument since it does not contain user arguments
        for argument in env::args().skip(1) {
            assert!(!argument.is_empty(), "Found empty command line argument.");
            assert!(
                argument.starts_with('-'),
                "Each command line argument is expected to start with '-'."
            );
            assert!(
                argument.find('=').is_some(),
                "Found command line argument without '='"
            );

            let argument_name = &argument.to_string()[1..argument.find('=').unwrap()];
            let raw_argument_value = &argument.to_string()[(argument.find('=').unwrap() + 1)..];
            let argument_type = self.get_argument_type(argument_name);
            assert!(argument_type.is_some(), "Unknown argument: {argument_name}");

            match argument_type.unwrap() {
                DataType::Integer => {
                    let value = raw_argument_value.parse::<i64>().unwrap_or_else(|_| {
                        panic!("Cannot convert argument value '{raw_argument_value}' into an integer.")
                    });
                    self.set_integer_argument(argument_name, value);
                }
                DataType::String => {
                    self.set_string_argument(argument_name, raw_argument_value);
                }
                DataType::Bool => {
                    let value = raw_argument_value.parse::<bool>().unwrap_or_else(|_| {
                        panic!("Cannot convert argument value '{raw_argument_value}' into a bool. Remember to use 'true' and 'false' for bools rather than numeric values.")
                    });
                    self.set_bool_argument(argument_name, value);
                }
            }
        }
    }

    pub fn define_new_category(&mut self, category_name: &str, short_description: &str) {
        assert!(!category_name.is_empty() && !short_description.is_empty());
        assert!(
            !self.categories.contains_key(category_name),
            "Category '{}' already exists, cannot create it twice.",
            category_name
        );

        let _ = self.categories.insert(
            category_name.to_string(),
            Category {
                short_description: short_description.to_string(),
                arguments: vec![],
            },
        );
    }

    pub fn define_integer_argument(
        &mut self,
        argument_name: &str,
        category_name: &str,
        short_description: &str,
        default_value: i64,
        min_value: i64,
        max_value: i64,
    ) {
        self.basic_checks_on_input(argument_name, category_name, short_description);

        self.categories
            .get_mut(category_name)
            .unwrap()
            .arguments
            .push(PairNameType {
                name: argument_name.to_string(),
                data_type: DataType::Integer,
            });

        let _ = self.arguments_integer.insert(
            argument_name.to_string(),
            IntegerEntry {
                short_description: short_description.to_string(),
                default_value,
                current_value: default_value,
                min_value,
                max_value,
            },
        );
    }

    pub fn define_string_argument(
        &mut self,
        argument_name: &str,
        category_name: &str,
        short_description: &str,
        default_value: &str,
        allowed_values: &[&str],
    ) {
        self.basic_checks_on_input(argument_name, category_name, short_description);
        assert!(
            allowed_values.is_empty() || allowed_values.iter().any(|s| *s == default_value),
            "Default value must be within the allowed values for the parameter '{}'.",
            argument_name
        );

        self.categories
            .get_mut(category_name)
            .unwrap()
            .arguments
            .push(PairNameType {
                name: argument_name.to_string(),
                data_type: DataType::String,
            });

        let _ = self.arguments_string.insert(
            argument_name.to_string(),
            StringEntry {
                short_description: short_description.to_string(),
                default_value: default_value.to_string(),
                current_value: default_value.to_string(),
                allowed_values: allowed_values.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn define_bool_argument(
        &mut self,
        argument_name: &str,
        category_name: &str,
        short_description: &str,
        default_value: bool,
    ) {
        self.basic_checks_on_input(argument_name, category_name, short_description);

        self.categories
            .get_mut(category_name)
            .unwrap()
            .arguments
            .push(PairNameType {
                name: argument_name.to_string(),
                data_type: DataType::Bool,
            });

        let _ = self.arguments_bool.insert(
            argument_name.to_string(),
            BoolEntry {
                short_description: short_description.to_string(),
                default_value,
                current_value: default_value,
            },
        );
    }

    fn basic_checks_on_input(
        &self,
        argument_name: &str,
        category_name: &str,
        short_description: &str,
    ) {
        assert!(
            !argument_name.is_empty() && !category_name.is_empty() && !short_description.is_empty()
        );
        assert!(
            self.categories.contains_key(category_name),
            "Unknown category '{}' for argument '{}'.",
            category_name,
            argument_name
        );
        assert!(
            self.get_argument_type(argument_name).is_none(),
            "Argument '{}' is defined twice.",
            argument_name
        );
    }
}

enum DataType {
    Integer,
    String,
    Bool,
}

struct PairNameType {
    name: String,
    data_type: DataType,
}

struct Category {
    short_description: String,
    arguments: Vec<PairNameType>,
}

struct IntegerEntry {
    short_description: String,
    default_value: i64,
    current_value: i64,
    min_value: i64,
    max_value: i64,
}

struct StringEntry {
    short_description: String,
    default_value: String,
    current_value: String,
    allowed_values: Vec<String>,
}

struct BoolEntry {
    short_description: String,
    default_value: bool,
    current_value: bool,
}
