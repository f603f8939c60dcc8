use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    RunPipeline,
    GenerateReports,
    ResetState,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::RunPipeline),
            "2" => Some(MenuChoice::GenerateReports),
            "3" => Some(MenuChoice::ResetState),
            "4" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

pub const MENU_TEXT: &str = "\
==================================================
Translation Pipeline Menu
==================================================
1. Run translation and similarity comparison
2. Generate reports only
3. Reset processing state
4. Exit
==================================================";

/// Prints the menu and reads lines until one names a valid option.
/// End of input reads as [`MenuChoice::Exit`].
pub fn read_choice<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<MenuChoice> {
    writeln!(output, "\n{}", MENU_TEXT)?;
    loop {
        write!(output, "Please select an option (1-4): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(MenuChoice::Exit);
        }
        match MenuChoice::parse(&line) {
            Some(choice) => return Ok(choice),
            None => writeln!(output, "Invalid choice. Please enter 1, 2, 3, or 4.")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn choose(input: &str) -> (MenuChoice, String) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let choice = read_choice(&mut reader, &mut out).unwrap();
        (choice, String::from_utf8(out).unwrap())
    }

    #[test]
    fn accepts_each_option() {
        assert_eq!(choose("1\n").0, MenuChoice::RunPipeline);
        assert_eq!(choose("2\n").0, MenuChoice::GenerateReports);
        assert_eq!(choose(" 3 \n").0, MenuChoice::ResetState);
        assert_eq!(choose("4\n").0, MenuChoice::Exit);
    }

    #[test]
    fn lists_every_option() {
        let (_, out) = choose("4\n");
        assert!(out.contains("1. Run translation and similarity comparison\n"));
        assert!(out.contains("2. Generate reports only\n"));
        assert!(out.contains("3. Reset processing state\n"));
        assert!(out.contains("4. Exit\n"));
    }

    #[test]
    fn reprompts_until_valid() {
        let (choice, out) = choose("x\n5\n\n2\n");
        assert_eq!(choice, MenuChoice::GenerateReports);
        assert_eq!(out.matches("Invalid choice").count(), 3);
        assert_eq!(out.matches("Please select an option").count(), 4);
    }

    #[test]
    fn end_of_input_exits() {
        assert_eq!(choose("").0, MenuChoice::Exit);
        assert_eq!(choose("9\n").0, MenuChoice::Exit);
    }
}
