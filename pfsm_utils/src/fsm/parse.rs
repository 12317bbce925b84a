//! Parser for the textual FSM description format
//!
//! ```text
//! #!/bin/pfsm
//! ?params <state_w> <input_w> <output_w>
//! ?state <label> <output> [<condition> <next_label>]
//! ?quit
//! ```
//!
//! Outputs are decimal or `0x` prefixed hex. Blank lines and `#` comments may appear between
//! the entries.
use super::{
    Condition,
    FsmProgram,
    Record,
    Transition,
};
use crate::params::HardwareParameters;
use kstring::KString;
use nom::{
    branch::alt,
    bytes::complete::{
        tag,
        take_till1,
    },
    character::complete::{
        digit1,
        hex_digit1,
        line_ending,
        multispace0,
        not_line_ending,
        space0,
        space1,
    },
    combinator::{
        eof,
        map,
        map_res,
        opt,
        value,
    },
    multi::many0,
    sequence::{
        pair,
        preceded,
        terminated,
        tuple,
    },
    IResult,
};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Parsing failed to match the grammar")]
    ParseMatch,
    #[error(transparent)]
    Params(#[from] crate::params::Error),
    #[error(transparent)]
    Fsm(#[from] super::Error),
}

fn shebang(input: &str) -> IResult<&str, &str> {
    terminated(tag("#!/bin/pfsm"), line_ending)(input)
}

fn decimal(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |s: &str| s.parse::<u32>())(input)
}

fn number(input: &str) -> IResult<&str, u64> {
    alt((
        map_res(preceded(tag("0x"), hex_digit1), |s: &str| {
            u64::from_str_radix(s, 16)
        }),
        map_res(digit1, |s: &str| s.parse::<u64>()),
    ))(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(char::is_whitespace)(input)
}

fn end_of_line(input: &str) -> IResult<&str, ()> {
    value((), pair(space0, line_ending))(input)
}

fn params(input: &str) -> IResult<&str, (u32, u32, u32)> {
    let (remaining, _) = tag("?params")(input)?;
    let (remaining, widths) = tuple((
        preceded(space1, decimal),
        preceded(space1, decimal),
        preceded(space1, decimal),
    ))(remaining)?;
    let (remaining, ()) = end_of_line(remaining)?;
    Ok((remaining, widths))
}

type RawState<'a> = (&'a str, u64, Option<(&'a str, &'a str)>);

fn state(input: &str) -> IResult<&str, RawState> {
    let (remaining, _) = tag("?state")(input)?;
    let (remaining, label) = preceded(space1, token)(remaining)?;
    let (remaining, output) = preceded(space1, number)(remaining)?;
    let (remaining, jump) = opt(pair(preceded(space1, token), preceded(space1, token)))(remaining)?;
    let (remaining, ()) = end_of_line(remaining)?;
    Ok((remaining, (label, output, jump)))
}

fn ignored(input: &str) -> IResult<&str, ()> {
    alt((
        value((), tuple((space0, tag("#"), not_line_ending, line_ending))),
        end_of_line,
    ))(input)
}

fn quit(input: &str) -> IResult<&str, ()> {
    value((), tuple((tag("?quit"), multispace0, eof)))(input)
}

type AlmostProgram<'a> = ((u32, u32, u32), Vec<RawState<'a>>);

fn fsm_file(input: &str) -> IResult<&str, AlmostProgram> {
    let (remaining, _) = shebang(input)?;
    let (remaining, _) = many0(ignored)(remaining)?;
    let (remaining, widths) = params(remaining)?;
    let (remaining, states) = many0(alt((map(state, Some), value(None, ignored))))(remaining)?;
    let (remaining, ()) = quit(remaining)?;
    Ok((remaining, (widths, states.into_iter().flatten().collect())))
}

/// Parse an FSM description from its textual form
/// # Errors
/// Returns an error if the text doesn't match the grammar or describes an invalid FSM
pub fn parse_fsm(input: &str) -> Result<FsmProgram, FileError> {
    let (_, ((state_w, input_w, output_w), states)) =
        fsm_file(input).map_err(|_| FileError::ParseMatch)?;
    let params = HardwareParameters::new(state_w, input_w, output_w)?;
    let mut program = FsmProgram::new(params);
    for (label, output, jump) in states {
        let transition = match jump {
            Some((condition, next)) => Some(Transition {
                condition: Condition::parse(condition, input_w)?,
                next: KString::from_ref(next),
            }),
            None => None,
        };
        program.add_record(Record {
            label: KString::from_ref(label),
            output,
            transition,
        });
    }
    Ok(program)
}

/// Reads an FSM description file
/// # Errors
/// Returns an error on IO failures or invalid FSM files
pub fn read_fsm_file<T>(filename: T) -> Result<FsmProgram, FileError>
where
    T: AsRef<Path>,
{
    let contents = std::fs::read_to_string(filename)?;
    parse_fsm(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shebang() {
        let (remaining, tag) = shebang("#!/bin/pfsm\n").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(tag, "#!/bin/pfsm");
    }

    #[test]
    fn test_number() {
        assert_eq!(number("0x1F ").unwrap(), (" ", 0x1F));
        assert_eq!(number("42\n").unwrap(), ("\n", 42));
        assert!(number("zz").is_err());
    }

    #[test]
    fn test_params() {
        let (remaining, widths) = params("?params\t4 2 16\n").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(widths, (4, 2, 16));
    }

    #[test]
    fn test_state() {
        let (remaining, (label, output, jump)) = state("?state idle 0x3\n").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(label, "idle");
        assert_eq!(output, 3);
        assert_eq!(jump, None);

        let (remaining, (label, output, jump)) = state("?state wait 7 -1 idle  \n").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(label, "wait");
        assert_eq!(output, 7);
        assert_eq!(jump, Some(("-1", "idle")));
    }

    #[test]
    fn test_ignored() {
        assert_eq!(ignored("# a comment\n").unwrap(), ("", ()));
        assert_eq!(ignored("   \n").unwrap(), ("", ()));
        assert!(ignored("?state a 0\n").is_err());
    }

    #[test]
    fn test_parse_fsm() {
        let input = "#!/bin/pfsm
# a three state handshake
?params 2 1 1
?state idle 0 1 done

?state busy 1
?state done 1 - idle
?quit
";
        let program = parse_fsm(input).unwrap();
        assert_eq!(*program.params(), HardwareParameters::new(2, 1, 1).unwrap());
        assert_eq!(program.records().len(), 3);
        assert_eq!(program.records()[1].label.as_str(), "busy");
        assert_eq!(program.records()[1].transition, None);
        assert_eq!(
            program.records()[2].transition,
            Some(Transition {
                condition: Condition::parse("-", 1).unwrap(),
                next: "idle".into(),
            })
        );
        assert_eq!(program.generate_bitstream().unwrap().len(), 24);
    }

    #[test]
    fn test_parse_fsm_errors() {
        assert!(matches!(
            parse_fsm("?params 2 1 1\n?quit\n"),
            Err(FileError::ParseMatch)
        ));
        assert!(matches!(
            parse_fsm("#!/bin/pfsm\n?params 0 1 1\n?quit\n"),
            Err(FileError::Params(_))
        ));
        assert!(matches!(
            parse_fsm("#!/bin/pfsm\n?params 2 2 1\n?state a 0 1 a\n?quit\n"),
            Err(FileError::Fsm(super::super::Error::BadCondition { .. }))
        ));
    }
}
