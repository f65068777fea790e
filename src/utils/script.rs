//! Rendering of the bash scripts executed on the cluster.
//!
//! Every process script shares the same skeleton: it clears the status
//! markers of its run directory, runs the tool specific functions in order,
//! and finally touches `script.ok` (or `script.wrong` as soon as one command
//! fails) and sends a notification mail.

use std::fmt::Display;

use crate::utils::layout::{status_dir, status_ok, status_wrong};
use crate::utils::settings::Settings;

/// Line separating the blocks of a script.
pub const BLOCK_SEPARATOR: &str =
    "#-------------------------------------------------------------------------------";

/// Output format of `/usr/bin/time` for every timed command.
pub const TIME_FORMAT: &str = "$SEP\\nElapsed real time (s): %e\\nCPU time in kernel mode (s): %S\\nCPU time in user mode (s): %U\\nPercentage of CPU: %P\\nMaximum resident set size(Kb): %M\\nAverage total memory use (Kb):%K";

const INDENT: &str = "    ";

//==============//
// Command line //
//==============//

/// A command executed inside a script function, followed by its return code
/// check.
#[derive(Clone, Debug)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    timed: bool,
    label: String,
}

impl CommandLine {
    /// A command rendered on a single line.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let label = program.split_whitespace().next().unwrap_or("").to_string();
        CommandLine {
            program,
            args: Vec::new(),
            timed: false,
            label,
        }
    }

    /// A command run under `/usr/bin/time`, one argument per line.
    pub fn timed(program: impl Into<String>) -> Self {
        CommandLine {
            timed: true,
            ..Self::new(program)
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Display) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Appends an argument when `condition` holds.
    pub fn arg_if(self, condition: bool, arg: impl Display) -> Self {
        if condition {
            self.arg(arg)
        } else {
            self
        }
    }

    /// Appends several arguments.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Display,
    {
        self.args.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    fn render(&self, lines: &mut Vec<String>) {
        if self.timed {
            lines.push(format!("{}/usr/bin/time \\", INDENT));
            lines.push(format!("{0}{0}--format=\"{1}\" \\", INDENT, TIME_FORMAT));
            if self.args.is_empty() {
                lines.push(format!("{0}{0}{1}", INDENT, self.program));
            } else {
                lines.push(format!("{0}{0}{1} \\", INDENT, self.program));
                let last = self.args.len() - 1;
                for (i, arg) in self.args.iter().enumerate() {
                    let continuation = if i == last { "" } else { " \\" };
                    lines.push(format!("{0}{0}{0}{1}{2}", INDENT, arg, continuation));
                }
            }
        } else {
            let mut line = format!("{}{}", INDENT, self.program);
            for arg in &self.args {
                line.push(' ');
                line.push_str(arg);
            }
            lines.push(line);
        }

        lines.push(format!("{}RC=$?", INDENT));
        lines.push(format!(
            "{}if [ $RC -ne 0 ]; then manage_error {} $RC; fi",
            INDENT, self.label
        ));
    }
}

//================//
// Shell function //
//================//

/// A `function name { ... }` block of a process script.
#[derive(Clone, Debug)]
pub struct ShellFunction {
    name: String,
    environment: Option<String>,
    body: Vec<String>,
}

impl ShellFunction {
    /// Creates an empty function.
    pub fn new(name: impl Into<String>) -> Self {
        ShellFunction {
            name: name.into(),
            environment: None,
            body: Vec::new(),
        }
    }

    /// Creates a function whose body runs inside a conda environment.
    pub fn in_environment(name: impl Into<String>, environment: impl Into<String>) -> Self {
        ShellFunction {
            environment: Some(environment.into()),
            ..Self::new(name)
        }
    }

    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a raw (already indented by the function) line.
    pub fn line(&mut self, line: impl Display) -> &mut Self {
        self.body.push(format!("{}{}", INDENT, line));
        self
    }

    /// Appends `echo "$SEP"`.
    pub fn separator(&mut self) -> &mut Self {
        self.line("echo \"$SEP\"")
    }

    /// Appends a command and its return code check.
    pub fn command(&mut self, command: CommandLine) -> &mut Self {
        command.render(&mut self.body);
        self
    }

    fn render(&self, lines: &mut Vec<String>) {
        lines.push(format!("function {}", self.name));
        lines.push(String::from("{"));
        if let Some(environment) = &self.environment {
            lines.push(format!("{}source activate {}", INDENT, environment));
        }
        lines.extend(self.body.iter().cloned());
        if self.environment.is_some() {
            lines.push(format!("{}conda deactivate", INDENT));
        }
        lines.push(String::from("}"));
    }
}

//================//
// Process script //
//================//

/// Values of the cluster a script is rendered for.
#[derive(Clone, Copy, Debug)]
pub struct ScriptContext<'a> {
    /// The name of the cluster, echoed in the log and the mails.
    pub cluster_name: &'a str,

    /// Application settings.
    pub settings: &'a Settings,
}

/// A complete process script.
#[derive(Clone, Debug)]
pub struct ProcessScript {
    process_name: String,
    run_dir: String,
    variables: Vec<(String, String)>,
    functions: Vec<ShellFunction>,
}

impl ProcessScript {
    /// Creates a script for the process named `process_name` (used in the
    /// notification mails) running in `run_dir`.
    pub fn new(process_name: impl Into<String>, run_dir: impl Into<String>) -> Self {
        ProcessScript {
            process_name: process_name.into(),
            run_dir: run_dir.into(),
            variables: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// The run directory of the process.
    pub fn run_dir(&self) -> &str {
        &self.run_dir
    }

    /// Adds an exported variable to the script header.
    pub fn variable(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Adds a function. Functions are called in the order they are added.
    pub fn function(&mut self, function: ShellFunction) -> &mut Self {
        self.functions.push(function);
        self
    }

    /// The names of the tool specific functions, in call order.
    pub fn function_names(&self) -> Vec<&str> {
        self.functions.iter().map(ShellFunction::name).collect()
    }

    /// Renders the script text.
    pub fn render(&self, context: &ScriptContext<'_>) -> String {
        let settings = context.settings;
        let mut lines: Vec<String> = Vec::new();

        lines.push(String::from("#!/bin/bash"));
        lines.push(BLOCK_SEPARATOR.to_string());
        lines.push(String::from("SEP=\"#########################################\""));
        lines.push(String::from("export HOST_IP=`curl --silent checkip.amazonaws.com`"));
        lines.push(String::from(
            "export HOST_ADDRESS=\"ec2-${HOST_IP//./-}-compute-1.amazonaws.com\"",
        ));
        lines.push(String::from("export AWS_CONFIG_FILE=/home/ubuntu/.aws/config"));
        lines.push(String::from(
            "export AWS_SHARED_CREDENTIALS_FILE=/home/ubuntu/.aws/credentials",
        ));
        lines.push(BLOCK_SEPARATOR.to_string());
        lines.push(format!(
            "MINICONDA3_BIN_PATH={}",
            settings.cluster.miniconda_bin_dir()
        ));
        lines.push(String::from("export PATH=$MINICONDA3_BIN_PATH:$PATH"));
        for (name, value) in &self.variables {
            lines.push(format!("export {}={}", name, value));
        }
        lines.push(BLOCK_SEPARATOR.to_string());
        lines.push(format!("STATUS_DIR={}", status_dir(&self.run_dir)));
        lines.push(format!("SCRIPT_STATUS_OK={}", status_ok(&self.run_dir)));
        lines.push(format!("SCRIPT_STATUS_WRONG={}", status_wrong(&self.run_dir)));
        lines.push(String::from("mkdir --parents $STATUS_DIR"));
        lines.push(String::from(
            "if [ -f $SCRIPT_STATUS_OK ]; then rm $SCRIPT_STATUS_OK; fi",
        ));
        lines.push(String::from(
            "if [ -f $SCRIPT_STATUS_WRONG ]; then rm $SCRIPT_STATUS_WRONG; fi",
        ));
        lines.push(BLOCK_SEPARATOR.to_string());

        self.render_init(context, &mut lines);
        for function in &self.functions {
            lines.push(BLOCK_SEPARATOR.to_string());
            function.render(&mut lines);
        }
        lines.push(BLOCK_SEPARATOR.to_string());
        render_end(&mut lines);
        lines.push(BLOCK_SEPARATOR.to_string());
        render_manage_error(&mut lines);
        lines.push(BLOCK_SEPARATOR.to_string());
        self.render_send_mail(context, &mut lines);
        lines.push(BLOCK_SEPARATOR.to_string());
        render_calculate_duration(&mut lines);
        lines.push(BLOCK_SEPARATOR.to_string());

        lines.push(String::from("init"));
        for function in &self.functions {
            lines.push(function.name.clone());
        }
        lines.push(String::from("end"));

        let mut script = lines.join("\n");
        script.push('\n');
        script
    }

    fn render_init(&self, context: &ScriptContext<'_>, lines: &mut Vec<String>) {
        let mut init = ShellFunction::new("init");
        init.line("INIT_DATETIME=`date --utc +%s`")
            .line("FORMATTED_INIT_DATETIME=`date --date=\"@$INIT_DATETIME\" \"+%Y-%m-%d %H:%M:%S\"`")
            .separator()
            .line("echo \"Script started at $FORMATTED_INIT_DATETIME+00:00.\"")
            .separator()
            .line(format!("echo \"CLUSTER: {}\"", context.cluster_name))
            .line("echo \"HOST NAME: $HOSTNAME\"")
            .line("echo \"HOST IP: $HOST_IP\"")
            .line("echo \"HOST ADDRESS: $HOST_ADDRESS\"");
        init.render(lines);
    }

    fn render_send_mail(&self, context: &ScriptContext<'_>, lines: &mut Vec<String>) {
        let settings = context.settings;
        let email = &settings.contact_email;
        let message = |outcome: &str| {
            format!(
                "The {} in node $HOSTNAME of cluster {} ended {} at $FORMATTED_END_DATETIME+00:00 with a run duration of $DURATION s ($FORMATTED_DURATION). Please review its log.<br/><br/>Regards,<br/>{}",
                self.process_name, context.cluster_name, outcome, settings.project_name
            )
        };

        let mut send_mail = ShellFunction::new("send_mail");
        send_mail
            .line(format!(
                "SUBJECT=\"{}: {}\"",
                settings.project_name, self.process_name
            ))
            .line("if [ \"$1\" == \"ok\" ]; then")
            .line(format!("    MESSAGE=\"{}\"", message("OK")))
            .line("elif [ \"$1\" == \"wrong\" ]; then")
            .line(format!("    MESSAGE=\"{}\"", message("WRONG")))
            .line("else")
            .line("     MESSAGE=\"\"")
            .line("fi")
            .line("DESTINATION_FILE=mail-destination.json")
            .line("echo \"{\" > $DESTINATION_FILE")
            .line(format!(
                "echo \"    \\\"ToAddresses\\\":  [\\\"{}\\\"],\" >> $DESTINATION_FILE",
                email
            ))
            .line("echo \"    \\\"CcAddresses\\\":  [],\" >> $DESTINATION_FILE")
            .line("echo \"    \\\"BccAddresses\\\":  []\" >> $DESTINATION_FILE")
            .line("echo \"}\" >> $DESTINATION_FILE")
            .line("MESSAGE_FILE=mail-message.json")
            .line("echo \"{\" > $MESSAGE_FILE")
            .line("echo \"    \\\"Subject\\\": {\" >> $MESSAGE_FILE")
            .line("echo \"        \\\"Data\\\":  \\\"$SUBJECT\\\",\" >> $MESSAGE_FILE")
            .line("echo \"        \\\"Charset\\\":  \\\"UTF-8\\\"\" >> $MESSAGE_FILE")
            .line("echo \"    },\" >> $MESSAGE_FILE")
            .line("echo \"    \\\"Body\\\": {\" >> $MESSAGE_FILE")
            .line("echo \"        \\\"Html\\\": {\" >> $MESSAGE_FILE")
            .line("echo \"            \\\"Data\\\":  \\\"$MESSAGE\\\",\" >> $MESSAGE_FILE")
            .line("echo \"            \\\"Charset\\\":  \\\"UTF-8\\\"\" >> $MESSAGE_FILE")
            .line("echo \"        }\" >> $MESSAGE_FILE")
            .line("echo \"    }\" >> $MESSAGE_FILE")
            .line("echo \"}\" >> $MESSAGE_FILE")
            .line(format!(
                "aws ses send-email --from {} --destination file://$DESTINATION_FILE --message file://$MESSAGE_FILE",
                email
            ));
        send_mail.render(lines);
    }
}

fn render_end(lines: &mut Vec<String>) {
    let mut end = ShellFunction::new("end");
    end.line("END_DATETIME=`date --utc +%s`")
        .line("FORMATTED_END_DATETIME=`date --date=\"@$END_DATETIME\" \"+%Y-%m-%d %H:%M:%S\"`")
        .line("calculate_duration")
        .separator()
        .line("echo \"Script ended OK at $FORMATTED_END_DATETIME+00:00 with a run duration of $DURATION s ($FORMATTED_DURATION).\"")
        .separator()
        .line("send_mail ok")
        .line("touch $SCRIPT_STATUS_OK")
        .line("exit 0");
    end.render(lines);
}

fn render_manage_error(lines: &mut Vec<String>) {
    let mut manage_error = ShellFunction::new("manage_error");
    manage_error
        .line("END_DATETIME=`date --utc +%s`")
        .line("FORMATTED_END_DATETIME=`date --date=\"@$END_DATETIME\" \"+%Y-%m-%d %H:%M:%S\"`")
        .line("calculate_duration")
        .separator()
        .line("echo \"ERROR: $1 returned error $2\"")
        .line("echo \"Script ended WRONG at $FORMATTED_END_DATETIME+00:00 with a run duration of $DURATION s ($FORMATTED_DURATION).\"")
        .separator()
        .line("send_mail wrong")
        .line("touch $SCRIPT_STATUS_WRONG")
        .line("exit 3");
    manage_error.render(lines);
}

fn render_calculate_duration(lines: &mut Vec<String>) {
    let mut calculate_duration = ShellFunction::new("calculate_duration");
    calculate_duration
        .line("DURATION=`expr $END_DATETIME - $INIT_DATETIME`")
        .line("HH=`expr $DURATION / 3600`")
        .line("MM=`expr $DURATION % 3600 / 60`")
        .line("SS=`expr $DURATION % 60`")
        .line("FORMATTED_DURATION=`printf \"%03d:%02d:%02d\\n\" $HH $MM $SS`");
    calculate_duration.render(lines);
}

//=========//
// Starter //
//=========//

/// Renders the starter that runs `script_name` from `run_dir`, appending its
/// output to the run's log file.
pub fn render_starter(run_dir: &str, script_name: &str, log_file: &str) -> String {
    format!(
        "#!/bin/bash\n{}\n{run_dir}/{script_name} &>>{run_dir}/{log_file}\n",
        BLOCK_SEPARATOR,
        run_dir = run_dir,
        script_name = script_name,
        log_file = log_file,
    )
}
