//! Grid Engine `qsub` options and their command-line mapping
//!
//! Every recognised option is an explicit field. Flags are emitted in a fixed
//! order: value flags, yes/no flags, presence flags, comma lists, key/value
//! lists, `-binding`, `-pe`, pass-through extras, then the command.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Parallel environment request (`-pe <name> <slots>`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParallelEnv {
    pub name: String,
    pub slots: Vec<String>,
}

/// Mail settings applied to jobs that do not set their own
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobDefaults {
    #[serde(default = "default_mail")]
    pub mail: String,
    #[serde(default)]
    pub mail_address: Vec<String>,
}

fn default_mail() -> String {
    "n".to_string()
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            mail: default_mail(),
            mail_address: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QsubOptions {
    // value flags
    pub optionfile: Option<String>,
    pub exectime: Option<String>,
    pub ar_id: Option<String>,
    pub account_string: Option<String>,
    pub checkpoint: Option<String>,
    pub ckpt: Option<String>,
    pub prefix_string: Option<String>,
    pub display: Option<String>,
    pub deadline: Option<String>,
    pub job_share: Option<u32>,
    pub jsv: Option<String>,
    pub mail: Option<String>,
    pub name: Option<String>,
    pub project_name: Option<String>,
    pub priority: Option<i32>,
    /// Task range, `n[-m[:s]]`
    pub array: Option<String>,
    pub max_running: Option<u32>,
    pub validation_level: Option<String>,
    pub working_dir: Option<String>,

    // yes/no flags
    pub binary: Option<bool>,
    pub join: Option<bool>,
    pub now: Option<bool>,
    pub pty: Option<bool>,
    pub reservation: Option<bool>,
    pub rerun: Option<bool>,
    pub shell: Option<bool>,
    pub sync: Option<bool>,

    // presence flags
    pub clear: bool,
    pub cwd: bool,
    pub hard: bool,
    pub hold: bool,
    pub notify: bool,
    pub soft: bool,
    pub verify: bool,
    /// Export the whole environment (`-V`)
    pub allval: bool,

    // comma lists
    pub delete_contexts: Vec<String>,
    pub stderr: Vec<String>,
    pub hold_jid: Vec<String>,
    pub hold_jid_ad: Vec<String>,
    pub stdin: Vec<String>,
    pub mail_address: Vec<String>,
    pub masterq: Vec<String>,
    pub stdout: Vec<String>,
    pub queue: Vec<String>,
    pub interpreter: Vec<String>,
    pub username: Vec<String>,

    // key/value lists
    pub set_contexts: BTreeMap<String, String>,
    pub var: BTreeMap<String, String>,
    pub additional_contexts: BTreeMap<String, String>,
    pub resource: BTreeMap<String, String>,

    pub binding: Vec<String>,
    pub parallel_env: Option<ParallelEnv>,

    /// Shorthand for `s_vmem` and `mem_req` resources
    pub mem: Option<String>,
    /// Shorthand for `-pe def_slot <slot>`
    pub slot: Option<String>,

    /// Raw arguments placed before the command, for options not listed here
    pub extra: Vec<String>,
}

impl QsubOptions {
    /// Fold shorthands and defaults into the concrete fields
    pub(crate) fn normalize(&mut self, defaults: &JobDefaults) {
        if let Some(mem) = self.mem.take() {
            self.resource.insert("s_vmem".to_string(), mem.clone());
            self.resource.insert("mem_req".to_string(), mem);
        }
        if let Some(slot) = self.slot.take() {
            self.parallel_env = Some(ParallelEnv {
                name: "def_slot".to_string(),
                slots: vec![slot],
            });
        }
        if self.mail.is_none() {
            self.mail = Some(defaults.mail.clone());
        }
        if self.mail_address.is_empty() {
            self.mail_address = defaults.mail_address.clone();
        }
    }

    /// Full scheduler argv: `program`, flags, then `command args...`
    pub fn to_argv(&self, program: &str, command: &str, args: &[String]) -> Vec<String> {
        let mut argv = Argv(vec![program.to_string()]);

        argv.value("-@", &self.optionfile);
        argv.value("-a", &self.exectime);
        argv.value("-ar", &self.ar_id);
        argv.value("-A", &self.account_string);
        argv.value("-c", &self.checkpoint);
        argv.value("-ckpt", &self.ckpt);
        argv.value("-C", &self.prefix_string);
        argv.value("-display", &self.display);
        argv.value("-dl", &self.deadline);
        argv.value("-js", &self.job_share);
        argv.value("-jsv", &self.jsv);
        argv.value("-m", &self.mail);
        argv.value("-N", &self.name);
        argv.value("-P", &self.project_name);
        argv.value("-p", &self.priority);
        argv.value("-t", &self.array);
        argv.value("-tc", &self.max_running);
        argv.value("-w", &self.validation_level);
        argv.value("-wd", &self.working_dir);

        argv.yes_no("-b", self.binary);
        argv.yes_no("-j", self.join);
        argv.yes_no("-now", self.now);
        argv.yes_no("-pty", self.pty);
        argv.yes_no("-R", self.reservation);
        argv.yes_no("-r", self.rerun);
        argv.yes_no("-shell", self.shell);
        argv.yes_no("-sync", self.sync);

        argv.flag("-clear", self.clear);
        argv.flag("-cwd", self.cwd);
        argv.flag("-hard", self.hard);
        argv.flag("-h", self.hold);
        argv.flag("-notify", self.notify);
        argv.flag("-soft", self.soft);
        // only the identifier on stdout, so it can be parsed
        argv.flag("-terse", true);
        argv.flag("-verify", self.verify);
        argv.flag("-V", self.allval);

        argv.list("-dc", &self.delete_contexts);
        argv.list("-e", &self.stderr);
        argv.list("-hold_jid", &self.hold_jid);
        argv.list("-hold_jid_ad", &self.hold_jid_ad);
        argv.list("-i", &self.stdin);
        argv.list("-M", &self.mail_address);
        argv.list("-masterq", &self.masterq);
        argv.list("-o", &self.stdout);
        argv.list("-q", &self.queue);
        argv.list("-S", &self.interpreter);
        argv.list("-u", &self.username);

        argv.pairs("-sc", &self.set_contexts);
        argv.pairs("-v", &self.var);
        argv.pairs("-ac", &self.additional_contexts);
        argv.pairs("-l", &self.resource);

        if !self.binding.is_empty() {
            argv.push("-binding");
            argv.0.extend(self.binding.iter().cloned());
        }
        if let Some(pe) = &self.parallel_env {
            argv.push("-pe");
            argv.push(&pe.name);
            argv.push(pe.slots.join(","));
        }

        argv.0.extend(self.extra.iter().cloned());
        argv.push(command);
        argv.0.extend(args.iter().cloned());
        argv.0
    }
}

struct Argv(Vec<String>);

impl Argv {
    fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }

    fn value<T: ToString>(&mut self, flag: &str, value: &Option<T>) {
        if let Some(v) = value {
            self.push(flag);
            self.push(v.to_string());
        }
    }

    fn yes_no(&mut self, flag: &str, value: Option<bool>) {
        if let Some(v) = value {
            self.push(flag);
            self.push(if v { "yes" } else { "no" });
        }
    }

    fn flag(&mut self, flag: &str, set: bool) {
        if set {
            self.push(flag);
        }
    }

    fn list(&mut self, flag: &str, values: &[String]) {
        if !values.is_empty() {
            self.push(flag);
            self.push(values.join(","));
        }
    }

    fn pairs(&mut self, flag: &str, values: &BTreeMap<String, String>) {
        if values.is_empty() {
            return;
        }
        let joined = values
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect::<Vec<_>>()
            .join(",");
        self.push(flag);
        self.push(joined);
    }
}
