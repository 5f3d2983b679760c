use std::collections::HashMap;

use crate::Error;
use indoc::indoc;
use subst::substitute;

const EXTRACT_JOBS: &str = indoc! { "
  You are extracting job postings from the HTML of a careers page.

  Rules:
  1. Copy every job title exactly as it appears in the page text. Do not rephrase, translate or complete it.
  2. Never invent a job. If you are unsure whether something is a posting, leave it out.
  3. Only include a job when the page gives it a verifiable anchor: a link to the posting, an apply button, a location, a date, or a description.
  4. Department names, team names, category headers, navigation links and filters are not jobs.
  5. Each job appears once.

  Respond with a JSON array and nothing else. Each element has exactly these fields:
  [
    {
      \"title\": \"exact job title\",
      \"company\": \"company name, or Unknown\",
      \"location\": \"location, or Not specified\",
      \"url\": \"link to the posting as written in the page, or an empty string\",
      \"description\": \"first 200 characters of the description, or an empty string\"
    }
  ]
  If the page lists no jobs, respond with [].

  <careers_page_html>
  ${PAGE_HTML}
  </careers_page_html>
"};

const VERIFY_INTEGRITY: &str = indoc! { "
  You are auditing a list of job postings that were extracted from a careers page.
  Some entries may be wrong: invented jobs, department or category headers, menu items, or duplicates.

  Keep an entry only if the same job is actually present in the page HTML below.
  Do not add entries and do not change any field of the entries you keep.

  Respond with a JSON array containing only the entries you keep, using the same fields as the input.
  If none of them are present, respond with [].

  <extracted_jobs>
  ${CANDIDATES_JSON}
  </extracted_jobs>

  <careers_page_html>
  ${PAGE_HTML}
  </careers_page_html>
"};

const VERIFY_DETAIL: &str = indoc! { "
  You are checking whether a web page is the detail page of one specific job posting.

  Expected posting:
  - Title: ${JOB_TITLE}
  - Company: ${JOB_COMPANY}

  Answer YES only if the page describes this job: its title corresponds to the expected title, and it has
  posting content such as a description, responsibilities or requirements, or a way to apply.
  Answer NO if the page is a login wall, a search results or listing page, an error or not found page,
  or describes a different job.

  Respond with a single word: YES or NO.

  <job_page_html>
  ${PAGE_HTML}
  </job_page_html>
"};

pub fn prompt_extract_jobs(page_html: &str) -> Result<String, Error> {
    let mut variables = HashMap::new();
    variables.insert("PAGE_HTML".to_string(), page_html.to_string());
    Ok(substitute(EXTRACT_JOBS, &variables)?)
}

pub fn prompt_verify_integrity(candidates_json: &str, page_html: &str) -> Result<String, Error> {
    let mut variables = HashMap::new();
    variables.insert("CANDIDATES_JSON".to_string(), candidates_json.to_string());
    variables.insert("PAGE_HTML".to_string(), page_html.to_string());
    Ok(substitute(VERIFY_INTEGRITY, &variables)?)
}

pub fn prompt_verify_detail(title: &str, company: &str, page_html: &str) -> Result<String, Error> {
    let mut variables = HashMap::new();
    variables.insert("JOB_TITLE".to_string(), title.to_string());
    variables.insert("JOB_COMPANY".to_string(), company.to_string());
    variables.insert("PAGE_HTML".to_string(), page_html.to_string());
    Ok(substitute(VERIFY_DETAIL, &variables)?)
}
